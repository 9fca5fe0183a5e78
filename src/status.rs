//! Index status overview.
//!
//! Quick summary of what's indexed: note and chunk counts, embedding
//! coverage, snapshot location and size, and when the last sync ran.

use anyhow::Result;

use crate::config::Config;
use crate::persist;

/// Run the status command: load the snapshot and print a summary.
pub fn run_status(config: &Config) -> Result<()> {
    println!("notedex — Index Status");
    println!("======================");
    println!();

    let persist_dir = &config.index.persist_dir;
    if !persist::exists(persist_dir) {
        println!("  No index at {}. Run `ndx sync` to create one.", persist_dir.display());
        return Ok(());
    }

    let index = persist::load(persist_dir)?;
    let snapshot_size = std::fs::metadata(persist_dir.join("index.json"))
        .map(|m| m.len())
        .unwrap_or(0);

    println!("  Snapshot:    {}", persist_dir.display());
    println!("  Size:        {}", format_bytes(snapshot_size));
    println!();
    println!("  Notes:       {}", index.doc_count());
    if let Some(scanned) = index.last_scan_count() {
        if scanned < index.doc_count() {
            println!(
                "               ({} live at last scan; deleted notes stay indexed)",
                scanned
            );
        }
    }
    println!("  Chunks:      {}", index.chunk_count());
    println!(
        "  Embedded:    {} / {} ({}%)",
        index.embedded_count(),
        index.chunk_count(),
        if index.chunk_count() > 0 {
            (index.embedded_count() * 100) / index.chunk_count()
        } else {
            0
        }
    );
    println!();
    let last_sync = match index.last_synced_at() {
        Some(ts) => format_ts_relative(ts),
        None => "never".to_string(),
    };
    println!("  Last sync:   {}", last_sync);
    println!();
    println!("  Notes roots:");
    for root in &config.notes.roots {
        println!("    {}", root.display());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(100), "100 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
    }

    #[test]
    fn test_format_ts_relative_just_now() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
    }
}
