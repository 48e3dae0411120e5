// Property: job status transitions form a monotonic lattice — from any
// status, the set of reachable statuses never re-includes an earlier one,
// and serde round-trips preserve every job field exactly.

use chrono::Utc;
use proptest::prelude::*;
use site_archiver_core::*;

fn arb_status() -> impl Strategy<Value = JobStatus> {
    prop_oneof![
        Just(JobStatus::Pending),
        Just(JobStatus::Processing),
        Just(JobStatus::Completed),
        Just(JobStatus::Failed),
    ]
}

fn arb_page_record() -> impl Strategy<Value = PageRecord> {
    ("[a-z]{1,12}", "[a-z/]{1,20}").prop_map(|(slug, path)| PageRecord {
        url: format!("https://ex.test/{}", slug),
        local_path: format!("{}.html", path.trim_matches('/')),
        archived_at: Utc::now(),
    })
}

fn arb_job() -> impl Strategy<Value = ArchiveJob> {
    (
        arb_status(),
        prop::collection::vec(arb_page_record(), 0..8),
        prop::option::of("[a-z ]{1,40}"),
    )
        .prop_map(|(status, pages, error)| {
            let mut job = ArchiveJob::new("https://ex.test/".into(), "ex.test".into());
            job.status = status;
            job.pages_archived = pages.len() as u32;
            job.pages = pages;
            job.error = error;
            job
        })
}

proptest! {
    #[test]
    fn prop_terminal_states_reach_nothing(status in arb_status(), next in arb_status()) {
        if status.is_terminal() {
            prop_assert!(!status.can_transition_to(next));
        }
    }

    #[test]
    fn prop_no_transition_reenters_pending(status in arb_status()) {
        if status != JobStatus::Pending {
            prop_assert!(!status.can_transition_to(JobStatus::Pending));
        }
    }

    #[test]
    fn prop_job_serde_round_trip(job in arb_job()) {
        let json = serde_json::to_string(&job).unwrap();
        let back: ArchiveJob = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.id, job.id);
        prop_assert_eq!(back.status, job.status);
        prop_assert_eq!(back.pages_archived, job.pages_archived);
        prop_assert_eq!(back.pages, job.pages);
        prop_assert_eq!(back.error, job.error);
    }

    #[test]
    fn prop_pages_archived_matches_records(job in arb_job()) {
        prop_assert_eq!(job.pages_archived as usize, job.pages.len());
    }
}
