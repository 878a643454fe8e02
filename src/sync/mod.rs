/*!
Outbound data synchronisation.

The solver queues every fresh binary clause it derives, in outer space, for an embedding to
drain --- the hook through which derived implications can be shared with collaborating solvers
without those solvers touching any internal state.

The queue is single-writer: only the orchestrator pushes, and pushes happen in derivation
order.
*/

use crate::structures::literal::Lit;

/// An outbound queue of derived binary clauses, in outer space.
#[derive(Default)]
pub struct BinQueue {
    queue: Vec<(Lit, Lit)>,
}

impl BinQueue {
    /// Queues a fresh binary clause.
    pub fn signal_new_bin(&mut self, a: Lit, b: Lit) {
        self.queue.push((a, b));
    }

    /// Drains every queued clause, in derivation order.
    pub fn drain(&mut self) -> Vec<(Lit, Lit)> {
        std::mem::take(&mut self.queue)
    }

    /// A count of queued clauses.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
