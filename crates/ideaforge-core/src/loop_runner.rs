use std::sync::Arc;
use tracing::{debug, info, warn};

use ideaforge_crew::{
    CancellationToken, ExecutionError, IdeaRecord, ImplementationReport, JudgeVerdict, Role,
    RoleExecutor, RoleKind, Task, TaskOutput,
};
use ideaforge_logging::{LogEvent, Logger, Stage};

use crate::context::IterationRecord;
use crate::error::LoopError;
use crate::outcome::LoopOutcome;
use crate::LoopContext;

/// How a single iteration ended
enum Step {
    /// The run is over
    Finished(LoopOutcome),
    /// Start the next iteration
    Continue(IterationRecord),
    Interrupted,
}

/// Orchestrates the create, refine, judge and report loop
pub struct LoopRunner {
    executor: RoleExecutor,
    creator: Role,
    refiner: Role,
    judge: Role,
    writer: Role,
    logger: Arc<Logger>,
    interrupted: CancellationToken,
}

impl LoopRunner {
    /// The executor's cancellation token doubles as the interrupt signal
    pub fn new(executor: RoleExecutor, logger: Arc<Logger>) -> Self {
        let interrupted = executor.cancellation_token();
        Self {
            executor,
            creator: Role::creator(),
            refiner: Role::refiner(),
            judge: Role::judge(),
            writer: Role::writer(),
            logger,
            interrupted,
        }
    }

    /// Replace the role of the same kind
    pub fn with_role(mut self, role: Role) -> Self {
        match role.kind {
            RoleKind::Creator => self.creator = role,
            RoleKind::Refiner => self.refiner = role,
            RoleKind::Judge => self.judge = role,
            RoleKind::Writer => self.writer = role,
        }
        self
    }

    pub fn role(&self, kind: RoleKind) -> &Role {
        match kind {
            RoleKind::Creator => &self.creator,
            RoleKind::Refiner => &self.refiner,
            RoleKind::Judge => &self.judge,
            RoleKind::Writer => &self.writer,
        }
    }

    /// Get a handle to signal interruption. Cancelling it also aborts the
    /// model call in flight.
    pub fn interrupt_handle(&self) -> CancellationToken {
        self.interrupted.clone()
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.is_cancelled()
    }

    /// Run the loop until an idea is accepted, the budget runs out or the
    /// user interrupts
    pub async fn run(&self, mut context: LoopContext) -> Result<LoopOutcome, LoopError> {
        if context.max_iterations == 0 {
            return Err(LoopError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        self.logger.log(&LogEvent::LoopStarted {
            prompt: context.prompt.clone(),
            model: self.executor.default_model().to_string(),
            max_iterations: context.max_iterations,
        });

        loop {
            if !context.should_continue() {
                self.logger.log(&LogEvent::MaxIterationsReached {
                    iterations: context.iteration,
                });
                let duration = context.total_duration();
                return Ok(LoopOutcome::exhausted(
                    context.iteration,
                    context.history,
                    duration,
                ));
            }

            self.logger.log(&LogEvent::IterationStarted {
                iteration: context.iteration,
            });

            match self.run_iteration(&mut context).await {
                Step::Finished(outcome) => return Ok(outcome),
                Step::Continue(record) => {
                    context.current = None;
                    self.logger.log(&LogEvent::IterationFinished {
                        iteration: context.iteration,
                        result: record.result.label(),
                    });
                    context.push_record(record);
                    context.increment_iteration();
                }
                Step::Interrupted => {
                    info!("Loop interrupted by user");
                    self.logger.log(&LogEvent::Interrupted {
                        iteration: context.iteration,
                    });
                    let duration = context.total_duration();
                    return Ok(LoopOutcome::interrupted(
                        context.iteration,
                        context.history,
                        duration,
                    ));
                }
            }
        }
    }

    /// Execute one stage, logging its start and end
    async fn run_stage(
        &self,
        iteration: usize,
        stage: Stage,
        role: &Role,
        task: &Task,
    ) -> Result<TaskOutput, ExecutionError> {
        self.logger.log(&LogEvent::StageStarted { iteration, stage });

        match self.executor.execute(role, task).await {
            Ok(output) => {
                self.logger.log(&LogEvent::StageCompleted {
                    iteration,
                    stage,
                    duration_secs: output.duration.as_secs_f64(),
                    chars: output.char_count(),
                });
                Ok(output)
            }
            Err(e @ ExecutionError::Cancelled(_)) => {
                debug!(iteration = iteration + 1, %stage, "Stage cancelled");
                Err(e)
            }
            Err(e) => {
                warn!(iteration = iteration + 1, %stage, error = %e, "Stage failed");
                self.logger.log(&LogEvent::StageFailed {
                    iteration,
                    stage,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run a single iteration. Stage failures end the iteration, not the run.
    async fn run_iteration(&self, context: &mut LoopContext) -> Step {
        let iteration = context.iteration;

        // Generating
        if self.is_interrupted() {
            return Step::Interrupted;
        }
        let task = Task::create_idea(&self.creator, &context.prompt);
        let output = match self
            .run_stage(iteration, Stage::Generating, &self.creator, &task)
            .await
        {
            Ok(output) => output,
            Err(ExecutionError::Cancelled(_)) => return Step::Interrupted,
            Err(e) => {
                return Step::Continue(IterationRecord::failed(
                    iteration,
                    Stage::Generating,
                    &e,
                    None,
                ))
            }
        };

        let idea = match IdeaRecord::parse(&output.text) {
            Ok(idea) => idea,
            Err(e) => {
                debug!(iteration = iteration + 1, output = %output.text, "Unparseable creator output");
                self.logger.log(&LogEvent::IdeaUnparseable {
                    iteration,
                    error: e.to_string(),
                });
                return Step::Continue(IterationRecord::unparseable(iteration, &e));
            }
        };
        self.logger.log(&LogEvent::IdeaParsed {
            iteration,
            business_name: idea.business_name.clone(),
        });
        let name = idea.business_name.clone();

        // Refining
        if self.is_interrupted() {
            return Step::Interrupted;
        }
        let task = Task::refine_idea(&self.refiner, &idea);
        let refined = match self
            .run_stage(iteration, Stage::Refining, &self.refiner, &task)
            .await
        {
            Ok(output) => output.text,
            // Nothing to merge, the idea goes to the judge as created
            Err(ExecutionError::EmptyResponse(_)) => String::new(),
            Err(ExecutionError::Cancelled(_)) => return Step::Interrupted,
            Err(e) => {
                return Step::Continue(IterationRecord::failed(
                    iteration,
                    Stage::Refining,
                    &e,
                    Some(&name),
                ))
            }
        };

        let (candidate, refinement) = idea.refine(&refined);
        self.logger.log(&LogEvent::RefinementApplied {
            iteration,
            summary: refinement.short_description(),
        });
        context.current = Some(candidate.clone());

        // Judging
        if self.is_interrupted() {
            return Step::Interrupted;
        }
        let task = Task::judge_idea(&self.judge, &candidate);
        let output = match self
            .run_stage(iteration, Stage::Judging, &self.judge, &task)
            .await
        {
            Ok(output) => output,
            Err(ExecutionError::Cancelled(_)) => return Step::Interrupted,
            Err(e) => {
                return Step::Continue(IterationRecord::failed(
                    iteration,
                    Stage::Judging,
                    &e,
                    Some(&name),
                ))
            }
        };

        let verdict = JudgeVerdict::parse(&output.text);
        self.logger.log(&LogEvent::VerdictReached {
            iteration,
            accepted: verdict.is_accepted(),
            verdict: verdict.short_description(),
        });

        if !verdict.is_accepted() {
            info!(
                iteration = iteration + 1,
                business_name = %name,
                "Idea rejected, generating a new one"
            );
            return Step::Continue(IterationRecord::rejected(iteration, &verdict, &name));
        }

        // Reporting
        if self.is_interrupted() {
            return Step::Interrupted;
        }
        let task = Task::write_report(&self.writer, &candidate);
        let output = match self
            .run_stage(iteration, Stage::Reporting, &self.writer, &task)
            .await
        {
            Ok(output) => output,
            Err(ExecutionError::Cancelled(_)) => return Step::Interrupted,
            Err(e) => {
                return Step::Continue(IterationRecord::failed(
                    iteration,
                    Stage::Reporting,
                    &e,
                    Some(&name),
                ))
            }
        };

        let report = ImplementationReport::new(output.text);
        let missing: Vec<String> = report
            .missing_sections()
            .iter()
            .map(|s| s.title().to_string())
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Report is missing sections");
        }
        self.logger.log(&LogEvent::ReportWritten {
            iteration,
            sections_found: report.sections_found.len(),
            missing,
        });

        context.current = None;
        let record = IterationRecord::accepted(iteration, &name);
        self.logger.log(&LogEvent::IterationFinished {
            iteration,
            result: record.result.label(),
        });
        context.push_record(record);

        let duration = context.total_duration();
        self.logger.log(&LogEvent::LoopCompleted {
            iterations: iteration + 1,
            business_name: name,
            duration_secs: duration.as_secs_f64(),
        });

        Step::Finished(LoopOutcome::success(
            iteration + 1,
            candidate,
            report,
            std::mem::take(&mut context.history),
            duration,
        ))
    }
}
