//! Spinner pool for records processed concurrently.
//!
//! A fixed number of spinner lines, one per worker, claimed and released by
//! record name.

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

pub(crate) struct SpinnerPool {
    mp: MultiProgress,
    spinners: Vec<ProgressBar>,
    slot_assignments: HashMap<String, usize>,
    free_slots: Vec<usize>,
}

impl SpinnerPool {
    /// Create a pool with `n` slots. When `quiet` is true nothing is drawn.
    pub(crate) fn new(n: usize, quiet: bool) -> Self {
        let mp = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let spinner_style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .expect("static pattern")
            .tick_chars("/-\\|");

        let spinners: Vec<ProgressBar> = (0..n)
            .map(|_| {
                let pb = mp.add(ProgressBar::new_spinner());
                pb.set_style(spinner_style.clone());
                pb
            })
            .collect();

        Self {
            mp,
            spinners,
            slot_assignments: HashMap::new(),
            free_slots: (0..n).rev().collect(),
        }
    }

    /// Claim a slot for `key` and set its message.
    pub(crate) fn claim(&mut self, key: &str, msg: String) {
        if let Some(slot) = self.free_slots.pop() {
            self.spinners[slot].reset();
            self.spinners[slot].enable_steady_tick(std::time::Duration::from_millis(100));
            self.spinners[slot].set_message(msg);
            self.slot_assignments.insert(key.to_string(), slot);
        }
    }

    /// Update the message of a claimed slot. No-op if `key` holds none.
    pub(crate) fn update(&self, key: &str, msg: String) {
        if let Some(&slot) = self.slot_assignments.get(key) {
            self.spinners[slot].set_message(msg);
        }
    }

    pub(crate) fn release(&mut self, key: &str) {
        if let Some(slot) = self.slot_assignments.remove(key) {
            self.spinners[slot].disable_steady_tick();
            self.spinners[slot].set_message("");
            self.spinners[slot].finish_and_clear();
            self.free_slots.push(slot);
        }
    }

    /// Print a line above the spinners without tearing them.
    pub(crate) fn println(&self, line: &str) {
        self.mp.suspend(|| log::info!("{}", line));
    }

    pub(crate) fn clear_all(&mut self) {
        for spinner in &self.spinners {
            spinner.disable_steady_tick();
            spinner.set_message("");
            spinner.finish_and_clear();
        }
        self.slot_assignments.clear();
        self.free_slots = (0..self.spinners.len()).rev().collect();
    }
}
