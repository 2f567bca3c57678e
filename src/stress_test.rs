use async_stream::stream;
use folio_core::{reconcile, DetailsPatch, DocumentPatch, PortfolioDocument, Section};
use folio_sync::{CacheConfigBuilder, DocumentCache, DocumentPath, MemoryStore, SyncEvent};
use futures::stream::Stream;
use futures::stream::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub num_writers: usize,
    pub updates_per_writer: usize,
    pub confirmed_writes: usize,
    pub failed_writes: usize,
    pub snapshots_applied: usize,
    pub total_time: Duration,
    pub avg_local_apply: Duration,
    pub converged: bool,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Writers:                   {:>38} ║", self.num_writers);
        println!("║  Updates per Writer:        {:>38} ║", self.updates_per_writer);
        println!("║  Confirmed Writes:          {:>38} ║", self.confirmed_writes);
        println!("║  Failed Writes:             {:>38} ║", self.failed_writes);
        println!("║  Snapshots Applied:         {:>38} ║", self.snapshots_applied);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Local Apply:       {:>36}µs ║", format!("{:.2}", self.avg_local_apply.as_micros()));
        println!("║  Converged:                 {:>38} ║", self.converged);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Mean of `times`, zero when empty.
fn average(times: &[Duration]) -> Duration {
    if times.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = times.iter().sum();
    Duration::from_secs_f64(total.as_secs_f64() / times.len() as f64)
}

/// Generator that yields (writer, section) pairs for update patterns
fn update_generator(num_writers: usize, num_updates: usize) -> impl Stream<Item = (usize, Section)> {
    stream! {
        let mut rng = StdRng::from_entropy();
        for _ in 0..num_updates {
            let writer = rng.gen_range(0..num_writers);
            let section = Section::ALL[rng.gen_range(0..Section::ALL.len())];
            yield (writer, section);
        }
    }
}

/// A patch touching one section, tagged with the writer and sequence number.
fn patch_for(section: Section, writer: usize, seq: usize) -> DocumentPatch {
    let entry = json!({ "writer": writer, "seq": seq });
    match section {
        Section::Details => DocumentPatch::new()
            .details(DetailsPatch::new().name(format!("writer-{}-{}", writer, seq))),
        Section::Skills => DocumentPatch::new().skills(
            [("technical".to_string(), vec![entry])].into_iter().collect(),
        ),
        other => DocumentPatch::new().sequence(other, vec![entry]),
    }
}

/// Stress test: many consumers of one cache issuing concurrent optimistic
/// updates against a slow, echoing store.
pub async fn stress_test_updates(
    num_writers: usize,
    updates_per_writer: usize,
    latency: Duration,
    echo: usize,
) -> StressTestStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Optimistic Update Stress Test                       ║");
    println!("║  Writers: {} | Updates/Writer: {} | Latency: {}ms ║",
             num_writers, updates_per_writer, latency.as_millis());
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let path = DocumentPath::default();
    let store = Arc::new(MemoryStore::new());
    store.set_latency(latency);
    store.set_echo(echo);

    let total_updates = num_writers * updates_per_writer;
    let config = CacheConfigBuilder::new()
        .path(path.clone())
        .event_capacity(total_updates * (echo + 2) + 64)
        .build();
    let cache = DocumentCache::with_config(store.clone(), config);
    let mut events = cache.events();
    if let Err(err) = cache.start() {
        println!("  Failed to start cache: {}", err);
    }
    let _ = cache.wait_synced().await;

    println!("\n[Phase 1/2] Issuing optimistic updates...");

    let mut updates = Box::pin(update_generator(num_writers, total_updates));
    let mut apply_times = Vec::with_capacity(total_updates);
    let mut seq = 0;
    while let Some((writer, section)) = updates.next().await {
        let consumer = cache.clone();
        let apply_start = Instant::now();
        if consumer.update(patch_for(section, writer, seq)).is_ok() {
            apply_times.push(apply_start.elapsed());
        }
        seq += 1;
        if seq % 100 == 0 {
            println!("  Updates issued: {}/{}", seq, total_updates);
        }
        tokio::task::yield_now().await;
    }

    println!("\n[Phase 2/2] Waiting for writes to settle...");

    let mut confirmed_writes = 0;
    let mut failed_writes = 0;
    let mut snapshots_applied = 0;
    let settle = tokio::time::timeout(Duration::from_secs(30), async {
        while confirmed_writes + failed_writes < apply_times.len() {
            match events.recv().await {
                Ok(SyncEvent::WriteConfirmed { .. }) => confirmed_writes += 1,
                Ok(SyncEvent::WriteFailed { .. }) => failed_writes += 1,
                Ok(SyncEvent::SnapshotApplied { .. }) => snapshots_applied += 1,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    println!("  Event receiver lagged by {}", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
    .await;
    if settle.is_err() {
        println!("  Timed out waiting for writes");
    }

    // Let trailing echoes drain, then compare against the store.
    let converged = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let remote: PortfolioDocument = reconcile(store.document(&path).as_ref(), &folio_core::defaults());
            if *cache.current() == remote {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or(false);

    cache.shutdown();

    let total_time = start.elapsed();
    let avg_local_apply = average(&apply_times);

    StressTestStats {
        num_writers,
        updates_per_writer,
        confirmed_writes,
        failed_writes,
        snapshots_applied,
        total_time,
        avg_local_apply,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_empty() {
        assert_eq!(average(&[]), Duration::ZERO);
    }

    #[test]
    fn test_average_of_samples() {
        let times = [
            Duration::from_millis(500),
            Duration::from_millis(1500),
            Duration::from_secs(1),
        ];
        assert_eq!(average(&times), Duration::from_secs(1));
    }
}
