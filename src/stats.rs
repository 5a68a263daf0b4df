//! Collection statistics.
//!
//! Quick summary of what is stored: document count for the configured
//! collection and the most frequent values of the grouping field. Used by
//! `logsync stats` to check that syncs are landing where expected.

use log_sync_core::Store;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::errors::SyncError;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

const TOP_GROUPS: usize = 10;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config, pool: &SqlitePool) -> Result<(), SyncError> {
    migrate::run_migrations(pool).await?;
    let store = SqliteStore::new(
        pool.clone(),
        config.store.namespace(),
        config.store.op_timeout(),
    );
    let total = store.count().await?;
    let groups = store.count_by(&config.sync.group_by).await?;

    println!("Log Sync — Collection Stats");
    println!("===========================");
    println!();
    println!("  Store:       {}", config.store.url);
    println!("  Collection:  {}", config.store.namespace());
    println!("  Documents:   {}", total);

    if !groups.is_empty() {
        let grouped: u64 = groups.iter().map(|g| g.count).sum();
        println!();
        println!("  By {}:", config.sync.group_by);
        println!("  {:<32} {:>8} {:>7}", "VALUE", "COUNT", "SHARE");
        println!("  {}", "-".repeat(49));
        for g in groups.iter().take(TOP_GROUPS) {
            println!(
                "  {:<32} {:>8} {:>6}%",
                truncate(&g.value, 32),
                g.count,
                percent(g.count, grouped)
            );
        }
        if groups.len() > TOP_GROUPS {
            println!("  ... and {} more", groups.len() - TOP_GROUPS);
        }
    }

    println!();
    Ok(())
}

fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        0
    } else {
        part * 100 / whole
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}
