//! The fan-out scheduler.
//!
//! A submitted expression is topologically sorted (Kahn) into steps:
//! every node of step `k` completes before any node of step `k + 1`
//! starts, which realises the pred-before-succ barrier per dependency
//! edge. Nodes inside a step run concurrently on the library pool, and
//! each algorithm fans its own per-tile subtasks out on the same pool --
//! the pool's bounded work-stealing provides the backpressure, so
//! subtask submission blocks instead of queueing without limit.
//!
//! The first failing node records its status on the expression, which
//! flips to `Aborted` and short-circuits the remaining steps. Device
//! arenas reset at every top-level submission.

use crate::descriptor::Param;
use crate::dispatch::{self, DispatchContext};
use crate::expression::{ExprNode, Expression};
use crate::library::Library;
use crate::status::Status;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn topo_steps(nodes: &[ExprNode]) -> Result<Vec<Vec<usize>>, Status> {
    let mut indegree: Vec<usize> = nodes.iter().map(|n| n.preds.len()).collect();
    let mut frontier: Vec<usize> =
        (0..nodes.len()).filter(|&i| indegree[i] == 0).collect();
    let mut steps = Vec::new();
    let mut seen = 0usize;

    while !frontier.is_empty() {
        frontier.sort_unstable();
        seen += frontier.len();
        let mut next = Vec::new();
        for &i in &frontier {
            for &s in &nodes[i].succs {
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    next.push(s);
                }
            }
        }
        steps.push(std::mem::take(&mut frontier));
        frontier = next;
    }

    if seen != nodes.len() {
        // A dependency cycle survived into submission.
        return Err(Status::InvalidState);
    }
    Ok(steps)
}

fn run_node(lib: &Library, node: &ExprNode, step_id: usize) -> Result<(), Status> {
    let device_id = match node.desc.device_id() {
        Some(id) => {
            let count = lib.accelerator().map(|a| a.device_count()).unwrap_or(0);
            if id >= count {
                return Err(Status::DeviceNotFound);
            }
            id
        }
        None => 0,
    };

    let algo = dispatch::resolve(lib, node)?;
    let ctx = DispatchContext { lib, node, step_id, task_id: node.index, device_id };

    let _profile = node
        .desc
        .is_set(Param::ProfileTime)
        .then(|| lib.profiler().scope(&dispatch::node_key(node)));

    match catch_unwind(AssertUnwindSafe(|| algo.execute(&ctx))) {
        Ok(result) => {
            if let Err(status) = result {
                crate::lib_log!(lib, status, "algorithm {} failed", algo.name());
            }
            result
        }
        Err(_) => {
            if cfg!(debug_assertions) {
                // A panic inside an algorithm is a broken contract; die
                // loudly in debug builds.
                std::process::abort();
            }
            crate::lib_log!(lib, Status::Error, "algorithm {} panicked", algo.name());
            Err(Status::Error)
        }
    }
}

/// Evaluate all nodes of `expr`; called by `Expression::submit_wait`.
pub(crate) fn submit(expr: &Expression) -> Result<(), Status> {
    let lib = expr.library().clone();
    let nodes = expr.nodes_snapshot();

    if let Some(acc) = lib.accelerator() {
        for device in 0..acc.device_count() {
            acc.scratch_reset(device)?;
        }
    }

    let steps = topo_steps(&nodes)?;
    for (step_id, step) in steps.iter().enumerate() {
        let results: Vec<Result<(), Status>> = lib
            .pool()
            .install(|| step.par_iter().map(|&i| run_node(&lib, &nodes[i], step_id)).collect());
        for result in results {
            result?;
        }
    }
    Ok(())
}
