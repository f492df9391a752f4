use crate::logging::{log, LogLevel};
use crate::model::PageStatus;
use std::collections::BTreeMap;
use std::time::Duration;

pub const CAT_PAGE_FETCH: &str = "Page Fetch";
pub const CAT_CHUNK_SAVE: &str = "Chunk Save";
pub const CAT_SNAPSHOT_SAVE: &str = "Snapshot Save";

const CATEGORIES_ORDER: [&str; 3] = [CAT_PAGE_FETCH, CAT_CHUNK_SAVE, CAT_SNAPSHOT_SAVE];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub ok: usize,
    pub fail: usize,
    pub skip_or_empty: usize,
    pub total_tasks: usize,
}

impl CategoryStats {
    pub fn add_ok(&mut self) {
        self.ok += 1;
    }
    pub fn add_fail(&mut self) {
        self.fail += 1;
    }
    pub fn add_skip(&mut self) {
        self.skip_or_empty += 1;
    }
    pub fn set_total(&mut self, total: usize) {
        self.total_tasks = total;
    }
    pub fn get_processed(&self) -> usize {
        self.ok + self.fail + self.skip_or_empty
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    categories: BTreeMap<&'static str, CategoryStats>,
}

impl RunStats {
    pub fn new() -> Self {
        RunStats {
            categories: CATEGORIES_ORDER
                .iter()
                .map(|cat| (*cat, CategoryStats::default()))
                .collect(),
        }
    }

    pub fn category(&self, name: &str) -> CategoryStats {
        self.categories.get(name).cloned().unwrap_or_default()
    }

    pub fn category_mut(&mut self, name: &'static str) -> &mut CategoryStats {
        self.categories.entry(name).or_default()
    }

    pub fn record_page(&mut self, status: PageStatus) {
        let pages = self.category_mut(CAT_PAGE_FETCH);
        match status {
            PageStatus::Fetched => pages.add_ok(),
            PageStatus::Empty => pages.add_skip(),
            PageStatus::Failed => pages.add_fail(),
        }
    }

    pub fn record_save(&mut self, category: &'static str, ok: bool) {
        let cat = self.category_mut(category);
        cat.set_total(cat.total_tasks + 1);
        if ok {
            cat.add_ok();
        } else {
            cat.add_fail();
        }
    }
}

pub fn print_summary(stats: &RunStats, disposal_method: &str, records: usize, duration: Duration) {
    let sep = "=".repeat(60);
    let title = format!("Run Summary (Disposal Method {})", disposal_method);
    println!("\n{}\n{:^60}\n{}", sep, title, sep);
    println!("Records Collected: {}", records);
    println!("Total Run Time:    {:.3?}", duration);
    println!("{}", "-".repeat(60));

    println!(
        "{:<17} {:<8} {:<12} {:<8} {:<8}",
        "Category", "OK", "Skip/Empty", "Fail", "Total"
    );
    println!("{}", "-".repeat(60));

    for cat_name in CATEGORIES_ORDER {
        let s = stats.category(cat_name);
        println!(
            "{:<17} {:<8} {:<12} {:<8} {:<8}",
            cat_name, s.ok, s.skip_or_empty, s.fail, s.total_tasks
        );
    }

    println!("{}", sep);

    log_overall_status(stats);

    let end_ts_str = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string();
    log(
        LogLevel::Step,
        &format!("--- Run Finished at {} ---", end_ts_str),
    );
}

fn log_overall_status(stats: &RunStats) {
    let page_failures = stats.category(CAT_PAGE_FETCH).fail;
    let save_failures =
        stats.category(CAT_CHUNK_SAVE).fail + stats.category(CAT_SNAPSHOT_SAVE).fail;

    if page_failures > 0 || save_failures > 0 {
        log(
            LogLevel::Warning,
            &format!(
                "Run completed with gaps: {} page(s) returned nothing after retries, {} save(s) failed. Check logs.",
                page_failures, save_failures
            ),
        );
    } else {
        log(LogLevel::Success, "Run completed successfully.");
    }
}
