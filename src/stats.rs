//! Index statistics.
//!
//! Summarizes what the configured collection holds: document and chunk
//! counts plus the embedding models that produced its vectors. Used by
//! `docqa stats`; needs no credentials.

use anyhow::Result;

use crate::config::Config;
use crate::pipeline::open_sqlite_index;

/// Run the stats command: query the index and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    if config.index.backend == "memory" {
        println!("Index backend is 'memory'; nothing persists between runs.");
        return Ok(());
    }

    let index = open_sqlite_index(config).await?;
    let stats = index.stats().await?;

    let db_size = std::fs::metadata(&config.index.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docqa Index Stats");
    println!("=================");
    println!();
    println!("  Database:    {}", config.index.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Collection:  {}", index.collection());
    println!();
    println!("  Documents:   {}", stats.documents);
    println!("  Chunks:      {}", stats.chunks);

    if !stats.models.is_empty() {
        println!();
        println!("  {:<32} {:>6}", "MODEL", "DIMS");
        println!("  {}", "-".repeat(39));
        for (model, dims) in &stats.models {
            println!("  {:<32} {:>6}", model, dims);
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
