use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{trace, warn};

/// Status lines shown while the scan runs.
pub const PHRASES: &[&str] = &[
    "The battlefield is quiet, but the Force is with us.",
    "Scanning enemy territory for vital intelligence...",
    "Advanced recon units have eyes on the objective.",
    "Trust in your training, Commander. We'll uncover the truth.",
    "Synchronizing Republic data feeds for optimal accuracy...",
    "Patience is a virtue, even in the heat of battle.",
    "ARC Troopers stand ready to adapt and overcome.",
    "Gathering intel is the first step to victory.",
    "Stealth and precision, the hallmarks of our success.",
    "The Jedi Council awaits our findings. Proceed with caution.",
];

/// Hands out phrases in shuffled order, reshuffling once every phrase was used.
pub struct PhraseDeck<R> {
    catalog: &'static [&'static str],
    order: Vec<usize>,
    cursor: usize,
    rng: R,
}

impl<R: Rng> PhraseDeck<R> {
    pub fn new(catalog: &'static [&'static str], rng: R) -> Self {
        let catalog = if catalog.is_empty() { PHRASES } else { catalog };
        let mut deck = Self {
            catalog,
            order: (0..catalog.len()).collect(),
            cursor: 0,
            rng,
        };
        deck.order.shuffle(&mut deck.rng);
        deck
    }

    pub fn next_phrase(&mut self) -> &'static str {
        if self.cursor >= self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
            trace!("status phrases reshuffled");
        }
        let phrase = self.catalog[self.order[self.cursor]];
        self.cursor += 1;
        phrase
    }
}

/// Destination for status lines.
pub trait StatusSink: Send + 'static {
    fn emit(&mut self, phrase: &str, elapsed: Duration);

    /// Called once after the animator stopped.
    fn finish(&mut self) {}
}

/// Spinner on stderr with status lines printed above it.
pub struct TerminalSink {
    spinner: ProgressBar,
}

impl TerminalSink {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.yellow} [{elapsed}] {msg}") {
            spinner.set_style(style.tick_strings(&[
                "▁▁▁▁▁",
                "▁▂▂▂▁",
                "▁▄▂▄▁",
                "▂▄▆▄▂",
                "▄▆█▆▄",
                "▂▄▆▄▂",
                "▁▄▂▄▁",
                "▁▂▂▂▁",
            ]));
        }
        spinner.set_message("Scan in progress...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for TerminalSink {
    fn emit(&mut self, phrase: &str, elapsed: Duration) {
        let line = format!("{} (Elapsed: {})", phrase.yellow(), format_elapsed(elapsed));
        if self.spinner.is_hidden() {
            println!("{}", line);
        } else {
            self.spinner.println(line);
        }
    }

    fn finish(&mut self) {
        self.spinner.finish_and_clear();
    }
}

/// Render whole seconds as `45s`, `1m5s` or `1h2m3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Prints a rotating status phrase every `period` until cancelled.
pub struct StatusAnimator<S, R = StdRng> {
    period: Duration,
    deck: PhraseDeck<R>,
    sink: S,
}

impl<S: StatusSink> StatusAnimator<S, StdRng> {
    pub fn new(period: Duration, sink: S) -> Self {
        Self::with_rng(period, sink, StdRng::from_entropy())
    }
}

impl<S, R> StatusAnimator<S, R>
where
    S: StatusSink,
    R: Rng + Send + 'static,
{
    pub fn with_rng(period: Duration, sink: S, rng: R) -> Self {
        Self {
            period,
            deck: PhraseDeck::new(PHRASES, rng),
            sink,
        }
    }

    /// Run on its own task; the returned handle is the only way to reach it.
    pub fn spawn(self) -> AnimatorHandle {
        let (stop, cancel) = oneshot::channel();
        let task = tokio::spawn(self.run(cancel));
        AnimatorHandle { stop, task }
    }

    /// Emit phrases until `cancel` fires or its sender is dropped.
    pub async fn run(mut self, mut cancel: oneshot::Receiver<()>) {
        let started = Instant::now();
        let mut ticker = interval_at(started + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Cancellation wins over a tick that became ready at the same time.
                biased;
                _ = &mut cancel => break,
                _ = ticker.tick() => {
                    let elapsed = Duration::from_secs(started.elapsed().as_secs());
                    let phrase = self.deck.next_phrase();
                    self.sink.emit(phrase, elapsed);
                }
            }
        }

        self.sink.finish();
    }
}

pub struct AnimatorHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl AnimatorHandle {
    /// Signal cancellation and wait until the animator has stopped.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "status animator ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        lines: Arc<Mutex<Vec<(String, Duration)>>>,
        finished: Arc<AtomicBool>,
    }

    impl RecordingSink {
        fn lines(&self) -> Vec<(String, Duration)> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl StatusSink for RecordingSink {
        fn emit(&mut self, phrase: &str, elapsed: Duration) {
            self.lines.lock().unwrap().push((phrase.to_string(), elapsed));
        }

        fn finish(&mut self) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    fn seeded(sink: RecordingSink, period: Duration) -> StatusAnimator<RecordingSink, StdRng> {
        StatusAnimator::with_rng(period, sink, StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_every_phrase_once_per_cycle() {
        let mut deck = PhraseDeck::new(PHRASES, StdRng::seed_from_u64(7));
        let mut expected: Vec<&str> = PHRASES.to_vec();
        expected.sort();

        for _ in 0..25 {
            let mut cycle: Vec<&str> = (0..PHRASES.len()).map(|_| deck.next_phrase()).collect();
            cycle.sort();
            assert_eq!(cycle, expected);
        }
    }

    #[test]
    fn test_empty_catalog_falls_back() {
        let mut deck = PhraseDeck::new(&[], StdRng::seed_from_u64(1));
        assert!(PHRASES.contains(&deck.next_phrase()));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0s");
        assert_eq!(format_elapsed(Duration::from_millis(45_900)), "45s");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1m5s");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "1h2m3s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_on_each_period_with_whole_seconds() {
        let sink = RecordingSink::default();
        let handle = seeded(sink.clone(), Duration::from_secs(5)).spawn();

        tokio::time::sleep(Duration::from_secs(12)).await;
        handle.stop().await;

        let lines = sink.lines();
        let elapsed: Vec<Duration> = lines.iter().map(|(_, d)| *d).collect();
        assert_eq!(elapsed, vec![Duration::from_secs(5), Duration::from_secs(10)]);
        assert_ne!(lines[0].0, lines[1].0);
        assert!(sink.finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_emitted_after_stop() {
        let sink = RecordingSink::default();
        let handle = seeded(sink.clone(), Duration::from_secs(5)).spawn();

        tokio::time::sleep(Duration::from_secs(16)).await;
        handle.stop().await;
        let emitted = sink.lines().len();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(sink.lines().len(), emitted);
        assert_eq!(emitted, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick() {
        let sink = RecordingSink::default();
        let handle = seeded(sink.clone(), Duration::from_secs(5)).spawn();

        handle.stop().await;

        assert!(sink.lines().is_empty());
        assert!(sink.finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_animator() {
        let sink = RecordingSink::default();
        let (stop, cancel) = oneshot::channel::<()>();
        drop(stop);

        seeded(sink.clone(), Duration::from_secs(5)).run(cancel).await;

        assert!(sink.lines().is_empty());
        assert!(sink.finished.load(Ordering::SeqCst));
    }
}
