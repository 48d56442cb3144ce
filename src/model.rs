/// Point-in-time snapshot of pool activity counters.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub active_workers: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub total_submitted: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub stolen_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        let workers = self.active_workers + self.idle_workers;
        if workers == 0 {
            return 0.0;
        }
        self.active_workers as f64 / workers as f64
    }

    pub fn success_rate(&self) -> f64 {
        let finished = self.completed_tasks + self.failed_tasks;
        if finished == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / finished as f64
    }
}
