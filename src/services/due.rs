//! Maintenance due calculator
//!
//! Pure arithmetic over dates and odometer readings. Both triggers are
//! independent: a job becomes due when either the calendar or the
//! accumulated usage says so, whichever comes first.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::MaintenancePolicy;
use crate::models::{Equipment, MaintenanceJob};

/// Next scheduled maintenance slot for a piece of equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct NextDue {
    pub due_date: NaiveDate,
    pub due_usage: i64,
}

/// Position of an active job relative to its two triggers.
/// Remaining values go negative once the trigger has passed.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct DueProjection {
    pub due_date: NaiveDate,
    pub due_usage: i64,
    pub days_remaining: i64,
    pub usage_remaining: i64,
}

impl DueProjection {
    /// Either trigger has fired
    pub fn needs_maintenance(&self) -> bool {
        self.days_remaining <= 0 || self.usage_remaining <= 0
    }

    /// Within the reminder window on either trigger
    pub fn due_soon(&self, policy: &MaintenancePolicy) -> bool {
        self.days_remaining <= policy.reminder_days
            || self.usage_remaining <= policy.reminder_usage
    }
}

/// Due calculator configured with the fleet's maintenance policy
#[derive(Debug, Clone, Copy)]
pub struct DueCalculator {
    policy: MaintenancePolicy,
}

impl DueCalculator {
    pub fn new(policy: MaintenancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MaintenancePolicy {
        &self.policy
    }

    /// Compute the next due slot from the last completed job, or from
    /// today and the current odometer when the equipment has no history.
    pub fn next_due(
        &self,
        equipment: &Equipment,
        last_completed: Option<&MaintenanceJob>,
        today: NaiveDate,
    ) -> NextDue {
        let (base_date, base_usage) = match last_completed {
            Some(job) => (
                job.completed_at.map(|t| t.date_naive()).unwrap_or(today),
                job.completed_usage.unwrap_or(equipment.current_usage),
            ),
            None => (today, equipment.current_usage),
        };

        NextDue {
            due_date: base_date + Duration::days(self.policy.interval_days),
            due_usage: base_usage + self.policy.interval_usage,
        }
    }

    /// Project an active job against today's date and odometer reading
    pub fn projection(
        &self,
        job: &MaintenanceJob,
        equipment: &Equipment,
        today: NaiveDate,
    ) -> DueProjection {
        DueProjection {
            due_date: job.due_date,
            due_usage: job.due_usage,
            days_remaining: (job.due_date - today).num_days(),
            usage_remaining: job.due_usage - equipment.current_usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;
    use chrono::{TimeZone, Utc};

    fn equipment(usage: i64) -> Equipment {
        Equipment {
            id: 1,
            plate: "ABC-123".to_string(),
            brand: "Toyota".to_string(),
            model: "Hilux".to_string(),
            year: 2021,
            tank_capacity: 20,
            current_usage: usage,
            active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn completed_job(completed_date: NaiveDate, completed_usage: i64) -> MaintenanceJob {
        MaintenanceJob {
            id: 7,
            equipment_id: 1,
            operator_id: 1,
            maintenance_type_id: 1,
            due_date: completed_date,
            due_usage: completed_usage,
            completed_at: Some(Utc.from_utc_datetime(&completed_date.and_hms_opt(10, 0, 0).unwrap())),
            completed_usage: Some(completed_usage),
            state: JobState::Completed,
            notes: None,
            cost: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_due_without_history() {
        let calc = DueCalculator::new(MaintenancePolicy::default());
        let due = calc.next_due(&equipment(5_000), None, date(2024, 1, 1));

        assert_eq!(due.due_date, date(2024, 3, 31));
        assert_eq!(due.due_usage, 15_000);
    }

    #[test]
    fn test_next_due_from_last_completed() {
        let calc = DueCalculator::new(MaintenancePolicy::default());
        let last = completed_job(date(2024, 2, 10), 12_000);
        let due = calc.next_due(&equipment(12_300), Some(&last), date(2024, 3, 1));

        assert_eq!(due.due_date, date(2024, 5, 10));
        assert_eq!(due.due_usage, 22_000);
    }

    #[test]
    fn test_next_due_is_strictly_after_completion() {
        let calc = DueCalculator::new(MaintenancePolicy::default());
        let last = completed_job(date(2024, 2, 10), 12_000);
        let due = calc.next_due(&equipment(12_000), Some(&last), date(2024, 2, 10));

        assert!(due.due_date > date(2024, 2, 10));
        assert!(due.due_usage > 12_000);
    }

    #[test]
    fn test_projection_remaining_values() {
        let calc = DueCalculator::new(MaintenancePolicy::default());
        let mut job = completed_job(date(2024, 4, 1), 0);
        job.state = JobState::Pending;
        job.completed_at = None;
        job.completed_usage = None;
        job.due_date = date(2024, 4, 1);
        job.due_usage = 10_000;

        let p = calc.projection(&job, &equipment(9_500), date(2024, 3, 29));
        assert_eq!(p.days_remaining, 3);
        assert_eq!(p.usage_remaining, 500);
        assert!(!p.needs_maintenance());
    }

    #[test]
    fn test_projection_goes_negative_when_overdue() {
        let calc = DueCalculator::new(MaintenancePolicy::default());
        let mut job = completed_job(date(2024, 4, 1), 0);
        job.state = JobState::Overdue;
        job.completed_at = None;
        job.completed_usage = None;
        job.due_date = date(2024, 4, 1);
        job.due_usage = 10_000;

        let p = calc.projection(&job, &equipment(10_200), date(2024, 4, 5));
        assert_eq!(p.days_remaining, -4);
        assert_eq!(p.usage_remaining, -200);
        assert!(p.needs_maintenance());
    }

    #[test]
    fn test_due_soon_or_semantics() {
        let policy = MaintenancePolicy::default();
        let calc = DueCalculator::new(policy);
        let mut job = completed_job(date(2024, 4, 1), 0);
        job.state = JobState::Pending;
        job.completed_at = None;
        job.completed_usage = None;
        job.due_date = date(2024, 4, 1);
        job.due_usage = 10_000;

        // 3 days out (within 5) but 500 km out (beyond 100): still due soon
        let p = calc.projection(&job, &equipment(9_500), date(2024, 3, 29));
        assert!(p.due_soon(&policy));

        // 30 days out but only 80 km out: due soon on the usage trigger
        let p = calc.projection(&job, &equipment(9_920), date(2024, 3, 2));
        assert!(p.due_soon(&policy));

        // Far out on both triggers
        let p = calc.projection(&job, &equipment(5_000), date(2024, 2, 1));
        assert!(!p.due_soon(&policy));
    }
}
