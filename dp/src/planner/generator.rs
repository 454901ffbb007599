//! Plan generator
//!
//! Fetches active issues, classifies them and assembles the bounded daily
//! plan: at most `max-priorities` focus tasks, one time-boxed admin block,
//! decomposition suggestions for multi-day work and everything else for
//! reference. Also owns re-planning around blockers and the closure ledger.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use tracing::{debug, info};

use super::admin::pack_admin_tasks;
use super::closure::ClosureLedger;
use super::config::PlannerConfig;
use super::decompose;
use super::error::PlanError;
use super::ranking::rank;
use crate::classifier::{MAX_PRIORITY_DAYS, TaskClassifier};
use crate::domain::{Category, Classification, ClosureRecord, DailyPlan, Issue, SubtaskSpec};
use crate::events::{Event, EventBus};
use crate::source::IssueSource;

/// Source name attached to events published by the generator
pub const EVENT_SOURCE: &str = "plan_generator";

/// Builds daily plans from the issue source
pub struct PlanGenerator {
    source: Arc<dyn IssueSource>,
    ledger: Arc<dyn ClosureLedger>,
    classifier: TaskClassifier,
    config: PlannerConfig,
    event_bus: Option<Arc<EventBus>>,
}

impl PlanGenerator {
    pub fn new(source: Arc<dyn IssueSource>, ledger: Arc<dyn ClosureLedger>, config: PlannerConfig) -> Self {
        Self {
            source,
            ledger,
            classifier: TaskClassifier::new(),
            config,
            event_bus: None,
        }
    }

    /// Publish `plan_generated` on this bus after every plan
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn has_event_bus(&self) -> bool {
        self.event_bus.is_some()
    }

    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    pub fn source(&self) -> Arc<dyn IssueSource> {
        Arc::clone(&self.source)
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn classifier(&self) -> &TaskClassifier {
        &self.classifier
    }

    /// Generate today's plan
    pub async fn generate_daily_plan(&self, previous_closure_rate: Option<f64>) -> Result<DailyPlan, PlanError> {
        self.generate_daily_plan_for(Local::now().date_naive(), previous_closure_rate)
            .await
    }

    /// Generate the plan for `date`
    ///
    /// Without an explicit closure rate, yesterday's ledger record is used.
    pub async fn generate_daily_plan_for(
        &self,
        date: NaiveDate,
        previous_closure_rate: Option<f64>,
    ) -> Result<DailyPlan, PlanError> {
        debug!(%date, ?previous_closure_rate, "PlanGenerator::generate_daily_plan_for: called");

        let issues = self.source.fetch_active_issues().await?;
        let classifications = self.classifier.classify_all(&issues);

        let previous_closure_rate = match previous_closure_rate {
            Some(rate) => Some(rate.clamp(0.0, 1.0)),
            None => self.get_previous_closure_rate(date)?,
        };

        let plan = self.assemble(date, classifications, None, previous_closure_rate);
        info!(
            %date,
            priorities = plan.priorities.len(),
            admin_tasks = plan.admin_block.tasks.len(),
            suggestions = plan.decomposition_suggestions.len(),
            "Generated daily plan"
        );

        self.emit_plan_generated(&plan).await;
        Ok(plan)
    }

    /// Rebuild `current_plan` around a newly detected blocker
    ///
    /// The blocker takes the first priority slot; the rest is recomputed
    /// from a fresh fetch. Date and closure rate carry over.
    pub async fn generate_replan(&self, blocking_issue: &Issue, current_plan: &DailyPlan) -> Result<DailyPlan, PlanError> {
        debug!(key = %blocking_issue.key, date = %current_plan.date, "PlanGenerator::generate_replan: called");

        let issues = self.source.fetch_active_issues().await?;
        let classifications = self.classifier.classify_all(&issues);
        let blocker = self.classifier.classify(blocking_issue);

        let plan = self.assemble(
            current_plan.date,
            classifications,
            Some(blocker),
            current_plan.previous_closure_rate,
        );
        info!(
            key = %blocking_issue.key,
            priorities = ?plan.priority_keys(),
            "Replanned around blocking task"
        );

        self.emit_plan_generated(&plan).await;
        Ok(plan)
    }

    /// Propose day-sized subtasks for a multi-day issue
    ///
    /// Only a proposal: nothing is created in the tracker.
    pub fn propose_decomposition(&self, issue: &Issue) -> Vec<SubtaskSpec> {
        let classification = self.classifier.classify(issue);
        debug!(key = %issue.key, days = classification.estimated_days, "PlanGenerator::propose_decomposition: called");
        if classification.estimated_days <= MAX_PRIORITY_DAYS {
            return Vec::new();
        }
        decompose::split(issue, classification.estimated_days)
    }

    /// Create approved subtasks under `parent_key`, in order
    pub async fn create_subtasks(&self, parent_key: &str, specs: &[SubtaskSpec]) -> Result<Vec<String>, PlanError> {
        debug!(parent_key, count = specs.len(), "PlanGenerator::create_subtasks: called");
        let mut keys = Vec::with_capacity(specs.len());
        for spec in specs {
            let key = self.source.create_subtask(parent_key, spec).await?;
            info!(parent_key, %key, "Created subtask");
            keys.push(key);
        }
        Ok(keys)
    }

    /// Share of `priority_tasks` no longer active in the tracker
    pub async fn calculate_closure_rate(
        &self,
        date: NaiveDate,
        priority_tasks: &[Classification],
    ) -> Result<f64, PlanError> {
        debug!(%date, count = priority_tasks.len(), "PlanGenerator::calculate_closure_rate: called");
        let incomplete = self.incomplete_priorities(priority_tasks).await?;
        let total = priority_tasks.len();
        Ok(ClosureRecord::rate(total.saturating_sub(incomplete.len()), total))
    }

    /// Compute and store the closure record for `date`
    pub async fn save_closure_record(
        &self,
        date: NaiveDate,
        priority_tasks: &[Classification],
    ) -> Result<ClosureRecord, PlanError> {
        debug!(%date, count = priority_tasks.len(), "PlanGenerator::save_closure_record: called");
        let incomplete = self.incomplete_priorities(priority_tasks).await?;
        let record = ClosureRecord::new(date, priority_tasks.len(), incomplete);
        self.ledger.save(&record)?;
        info!(
            %date,
            completed = record.completed_priorities,
            total = record.total_priorities,
            rate = record.closure_rate,
            "Saved closure record"
        );
        Ok(record)
    }

    pub fn load_closure_record(&self, date: NaiveDate) -> Result<Option<ClosureRecord>, PlanError> {
        Ok(self.ledger.load(date)?)
    }

    /// Closure rate recorded for the day before `date`
    pub fn get_previous_closure_rate(&self, date: NaiveDate) -> Result<Option<f64>, PlanError> {
        let Some(yesterday) = date.checked_sub_days(Days::new(1)) else {
            return Ok(None);
        };
        Ok(self.load_closure_record(yesterday)?.map(|record| record.closure_rate))
    }

    /// Priority keys still present in a fresh fetch of active issues
    async fn incomplete_priorities(&self, priority_tasks: &[Classification]) -> Result<Vec<String>, PlanError> {
        let active = self.source.fetch_active_issues().await?;
        let active_keys: HashSet<&str> = active.iter().map(|issue| issue.key.as_str()).collect();
        let incomplete = priority_tasks
            .iter()
            .map(|task| task.key())
            .filter(|key| active_keys.contains(key))
            .map(str::to_string)
            .collect();
        Ok(incomplete)
    }

    fn assemble(
        &self,
        date: NaiveDate,
        classifications: Vec<Classification>,
        forced: Option<Classification>,
        previous_closure_rate: Option<f64>,
    ) -> DailyPlan {
        let forced_key = forced.as_ref().map(|c| c.key().to_string());
        let (decomposition_suggestions, rest): (Vec<_>, Vec<_>) = classifications
            .into_iter()
            .filter(|c| Some(c.key()) != forced_key.as_deref())
            .partition(|c| c.category == Category::LongRunning);

        let eligible = rest.iter().filter(|c| is_priority_candidate(c)).cloned().collect();
        let mut priorities: Vec<Classification> = forced.into_iter().collect();
        let open_slots = self.config.priority_limit().saturating_sub(priorities.len());
        priorities.extend(rank(eligible).into_iter().take(open_slots));

        let admin_tasks = rest
            .iter()
            .filter(|c| c.category == Category::Administrative)
            .cloned()
            .collect();
        let packing = pack_admin_tasks(admin_tasks, &self.config);

        let placed: HashSet<&str> = priorities
            .iter()
            .chain(packing.block.tasks.iter())
            .map(|c| c.key())
            .collect();
        let other_tasks = rest.iter().filter(|c| !placed.contains(c.key())).cloned().collect();

        DailyPlan {
            date,
            priorities,
            admin_block: packing.block,
            other_tasks,
            previous_closure_rate,
            decomposition_suggestions,
        }
    }

    async fn emit_plan_generated(&self, plan: &DailyPlan) {
        if let Some(bus) = &self.event_bus {
            bus.publish(Event::plan_generated(EVENT_SOURCE, plan)).await;
        }
    }
}

fn is_priority_candidate(c: &Classification) -> bool {
    c.is_priority_eligible
        && !c.has_dependencies
        && c.estimated_days <= MAX_PRIORITY_DAYS
        && !matches!(c.category, Category::Administrative | Category::Blocking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IssueLink;
    use crate::events::{EventType, handler_fn};
    use crate::planner::MemoryClosureLedger;
    use crate::source::{MemoryIssueSource, SourceError};
    use std::sync::Mutex;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
    }

    fn generator(issues: Vec<Issue>) -> (Arc<MemoryIssueSource>, Arc<MemoryClosureLedger>, PlanGenerator) {
        let source = Arc::new(MemoryIssueSource::new(issues));
        let ledger = Arc::new(MemoryClosureLedger::new());
        let planner = PlanGenerator::new(source.clone(), ledger.clone(), PlannerConfig::default());
        (source, ledger, planner)
    }

    fn sample_issues() -> Vec<Issue> {
        vec![
            Issue::new("PROJ-1", "Fix login").with_priority("High").with_story_points(1.0),
            Issue::new("PROJ-2", "Update docs").with_priority("Low").with_story_points(1.0),
            Issue::new("PROJ-3", "Cache layer").with_priority("Medium").with_story_points(2.0),
            Issue::new("PROJ-4", "Refactor").with_priority("Highest").with_story_points(1.0),
            Issue::new("PROJ-5", "Big migration").with_story_points(8.0),
            Issue::new("PROJ-6", "Waiting on vendor")
                .with_link(IssueLink::new("is blocked by", "VEND-1")),
            Issue::new("PROJ-7", "Weekly report").with_label("report").with_time_estimate(1800),
        ]
    }

    #[tokio::test]
    async fn test_plan_shape() {
        let (_, _, planner) = generator(sample_issues());
        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();

        assert_eq!(plan.date, date());
        assert_eq!(plan.priority_keys(), vec!["PROJ-4", "PROJ-1", "PROJ-3"]);
        assert_eq!(plan.decomposition_suggestions.len(), 1);
        assert_eq!(plan.decomposition_suggestions[0].key(), "PROJ-5");
        assert!(plan.admin_block.contains("PROJ-7"));

        let others: Vec<_> = plan.other_tasks.iter().map(|c| c.key()).collect();
        assert_eq!(others, vec!["PROJ-2", "PROJ-6"]);
        assert_eq!(plan.previous_closure_rate, None);
    }

    #[tokio::test]
    async fn test_previous_closure_rate_from_ledger() {
        let (_, ledger, planner) = generator(sample_issues());
        let yesterday = date().pred_opt().unwrap();
        ledger
            .save(&ClosureRecord::new(yesterday, 2, vec!["PROJ-1".to_string()]))
            .unwrap();

        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();
        assert_eq!(plan.previous_closure_rate, Some(0.5));

        let plan = planner.generate_daily_plan_for(date(), Some(0.9)).await.unwrap();
        assert_eq!(plan.previous_closure_rate, Some(0.9));
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let (source, _, planner) = generator(sample_issues());
        source.fail_with("tracker down");

        let err = planner.generate_daily_plan_for(date(), None).await.unwrap_err();
        assert!(matches!(err, PlanError::Source(SourceError::Connection(_))));
    }

    #[tokio::test]
    async fn test_replan_puts_blocker_first() {
        let (source, _, planner) = generator(sample_issues());
        let plan = planner.generate_daily_plan_for(date(), Some(0.5)).await.unwrap();

        let blocker = Issue::new("BLOCK-1", "Prod down").with_priority("Blocker");
        source.add_issue(blocker.clone());

        let replan = planner.generate_replan(&blocker, &plan).await.unwrap();
        assert_eq!(replan.priorities[0].key(), "BLOCK-1");
        assert_eq!(replan.priorities[0].category, Category::Blocking);
        assert_eq!(replan.priority_keys(), vec!["BLOCK-1", "PROJ-4", "PROJ-1"]);
        assert_eq!(replan.date, plan.date);
        assert_eq!(replan.previous_closure_rate, Some(0.5));
        assert!(replan.other_tasks.iter().all(|c| c.key() != "BLOCK-1"));
    }

    #[tokio::test]
    async fn test_plan_generated_event() {
        let (_, _, planner) = generator(sample_issues());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let bus = crate::events::create_event_bus();
        let sink = seen.clone();
        bus.subscribe(
            EventType::PlanGenerated,
            handler_fn("capture", move |event| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(event.event_data());
                    Ok(())
                }
            }),
        );
        let planner = planner.with_event_bus(bus);
        assert!(planner.has_event_bus());

        planner.generate_daily_plan_for(date(), None).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["plan_date"], "2024-05-14");
        assert_eq!(seen[0]["priority_count"], 3);
        assert_eq!(seen[0]["admin_task_count"], 1);
    }

    #[tokio::test]
    async fn test_propose_decomposition_never_creates() {
        let (source, _, planner) = generator(Vec::new());
        let big = Issue::new("PROJ-5", "Big migration").with_story_points(8.0);

        let specs = planner.propose_decomposition(&big);
        assert_eq!(specs.len(), 6);
        assert!(specs.iter().all(|s| s.estimated_days <= 1.0));
        assert_eq!(source.create_calls(), 0);

        assert!(planner.propose_decomposition(&Issue::new("PROJ-1", "Small")).is_empty());
    }

    #[tokio::test]
    async fn test_create_subtasks() {
        let parent = Issue::new("PROJ-5", "Big migration").with_story_points(4.0);
        let (source, _, planner) = generator(vec![parent.clone()]);

        let specs = planner.propose_decomposition(&parent);
        let keys = planner.create_subtasks("PROJ-5", &specs).await.unwrap();

        assert_eq!(keys.len(), specs.len());
        assert_eq!(source.create_calls(), specs.len());
    }

    #[tokio::test]
    async fn test_closure_record() {
        let (source, ledger, planner) = generator(sample_issues());
        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();
        source.close_issue("PROJ-4");

        let rate = planner.calculate_closure_rate(date(), &plan.priorities).await.unwrap();
        assert!((rate - 1.0 / 3.0).abs() < 1e-9);

        let record = planner.save_closure_record(date(), &plan.priorities).await.unwrap();
        assert_eq!(record.completed_priorities, 1);
        assert_eq!(record.incomplete_tasks, vec!["PROJ-1", "PROJ-3"]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(planner.load_closure_record(date()).unwrap(), Some(record));

        let tomorrow = date().succ_opt().unwrap();
        let previous = planner.get_previous_closure_rate(tomorrow).unwrap().unwrap();
        assert!((previous - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_configured_limits_cannot_exceed_ceilings() {
        let mut issues: Vec<Issue> = (1..=6)
            .map(|i| Issue::new(format!("PROJ-{}", i), "Work").with_priority("High"))
            .collect();
        issues.extend((1..=10).map(|i| {
            Issue::new(format!("ADM-{}", i), "Paperwork")
                .with_label("admin")
                .with_time_estimate(1800)
        }));
        let config = PlannerConfig {
            max_priorities: 5,
            admin_capacity_minutes: 600,
            ..Default::default()
        };
        let planner = PlanGenerator::new(
            Arc::new(MemoryIssueSource::new(issues)),
            Arc::new(MemoryClosureLedger::new()),
            config,
        );

        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();
        assert_eq!(plan.priorities.len(), 3);
        assert!(plan.admin_block.time_allocation_minutes <= 90);
    }

    #[tokio::test]
    async fn test_huge_admin_estimate_is_deferred() {
        let (_, _, planner) = generator(vec![
            Issue::new("ADM-1", "Timesheet").with_label("admin").with_time_estimate(1800),
            Issue::new("ADM-2", "Audit").with_label("admin").with_story_points(1e12),
        ]);

        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();
        assert!(plan.admin_block.contains("ADM-1"));
        assert!(!plan.admin_block.contains("ADM-2"));
        assert!(plan.other_tasks.iter().any(|c| c.key() == "ADM-2"));
    }

    #[test]
    fn test_propose_decomposition_huge_estimate() {
        let (_, _, planner) = generator(Vec::new());
        let huge = Issue::new("PROJ-9", "Rewrite everything").with_story_points(1e30);

        let specs = planner.propose_decomposition(&huge);
        assert!(specs.len() >= 2);
        assert!(specs.iter().all(|s| s.estimated_days <= 1.0));
    }

    #[tokio::test]
    async fn test_closure_counts_deleted_issue_as_completed() {
        let (source, _, planner) = generator(vec![
            Issue::new("PROJ-1", "Fix login").with_priority("High"),
            Issue::new("PROJ-2", "Update docs").with_priority("High"),
        ]);
        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();
        assert_eq!(plan.priority_keys(), vec!["PROJ-1", "PROJ-2"]);

        assert!(source.remove_issue("PROJ-1"));

        let rate = planner.calculate_closure_rate(date(), &plan.priorities).await.unwrap();
        assert_eq!(rate, 0.5);

        let record = planner.save_closure_record(date(), &plan.priorities).await.unwrap();
        assert_eq!(record.completed_priorities, 1);
        assert_eq!(record.incomplete_tasks, vec!["PROJ-2"]);
    }

    #[tokio::test]
    async fn test_closure_uses_one_active_fetch() {
        let (source, _, planner) = generator(sample_issues());
        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();
        let before = source.fetch_calls();

        planner.calculate_closure_rate(date(), &plan.priorities).await.unwrap();
        assert_eq!(source.fetch_calls(), before + 1);
    }

    #[tokio::test]
    async fn test_closure_source_error_propagates() {
        let (source, _, planner) = generator(sample_issues());
        let plan = planner.generate_daily_plan_for(date(), None).await.unwrap();
        source.fail_with("tracker down");

        let err = planner.save_closure_record(date(), &plan.priorities).await.unwrap_err();
        assert!(matches!(err, PlanError::Source(_)));
    }

    #[tokio::test]
    async fn test_closure_rate_empty_is_zero() {
        let (_, _, planner) = generator(Vec::new());
        assert_eq!(planner.calculate_closure_rate(date(), &[]).await.unwrap(), 0.0);
    }
}
