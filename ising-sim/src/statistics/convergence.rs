/// Windowed energy-stabilization detector.
///
/// Keeps the last `window` energy samples in a ring buffer. Once `window`
/// earlier samples exist, each new sample `E_k` is compared with
/// `E_{k - window}`; the monitor reports convergence when the two differ by
/// less than `threshold`. `window = 1` compares consecutive samples.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    window: usize,
    threshold: f64,
    /// Ring buffer of the last `window` samples.
    ring: Vec<f64>,
    /// Position the next sample is written to; holds `E_{k - window}` once full.
    ring_pos: usize,
    /// Total number of samples pushed so far.
    n_recorded: usize,
    /// Sample index at which convergence was first detected.
    converged_at: Option<usize>,
    /// `E_k - E_{k - window}` of the latest comparison.
    last_delta: Option<f64>,
}

impl ConvergenceMonitor {
    pub fn new(window: usize, threshold: f64) -> Self {
        assert!(window >= 1, "convergence window must be >= 1");
        Self {
            window,
            threshold,
            ring: vec![0.0; window],
            ring_pos: 0,
            n_recorded: 0,
            converged_at: None,
            last_delta: None,
        }
    }

    /// Record sample `E_k` and return whether the energy has stabilized.
    ///
    /// After the first detection the monitor stays converged.
    pub fn push(&mut self, energy: f64) -> bool {
        if self.converged_at.is_some() {
            return true;
        }

        let k = self.n_recorded;
        let old = self.ring[self.ring_pos];
        self.ring[self.ring_pos] = energy;
        self.ring_pos = (self.ring_pos + 1) % self.window;
        self.n_recorded += 1;

        if k < self.window {
            return false;
        }
        let delta = energy - old;
        self.last_delta = Some(delta);
        if delta.abs() < self.threshold {
            self.converged_at = Some(k);
            return true;
        }
        false
    }

    /// 0-based sample index at which convergence was detected.
    pub fn converged_at(&self) -> Option<usize> {
        self.converged_at
    }

    pub fn n_recorded(&self) -> usize {
        self.n_recorded
    }

    /// `E_k - E_{k - window}` from the most recent comparison made by
    /// [`push`](Self::push). `None` until `window` earlier samples exist.
    pub fn window_delta(&self) -> Option<f64> {
        self.last_delta
    }
}
