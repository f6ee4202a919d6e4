//! Process tree snapshot and best-effort teardown.
//!
//! Termination is two-phase: every process in the snapshot gets a kill
//! signal (children before the root), then a second sweep sends a terminate
//! signal to anything from the snapshot that is still alive. The sweep only
//! touches a pid whose start time still matches the snapshot, so a reused
//! pid is left alone. The snapshot is taken once, so a grandchild forked
//! while the sweep is in progress can survive.

use std::collections::{HashMap, HashSet, VecDeque};
use sysinfo::{Pid, Process, ProcessStatus, Signal, System};
use tracing::{debug, warn};

/// A process and its descendants at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTree {
    root: u32,
    /// Deepest first
    descendants: Vec<u32>,
}

impl ProcessTree {
    /// Enumerate `root` and its current descendants.
    pub fn snapshot(root: u32) -> Self {
        let mut sys = System::new();
        sys.refresh_processes();
        Self::from_system(root, &sys)
    }

    fn from_system(root: u32, sys: &System) -> Self {
        let links = sys.processes().iter().filter_map(|(pid, process)| {
            process
                .parent()
                .map(|parent| (pid.as_u32(), parent.as_u32()))
        });
        Self::from_parent_links(root, links)
    }

    /// Build the tree from `(pid, parent_pid)` pairs.
    pub fn from_parent_links(root: u32, links: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for (pid, parent) in links {
            if pid != parent {
                children.entry(parent).or_default().push(pid);
            }
        }
        for kids in children.values_mut() {
            kids.sort_unstable();
        }

        // Breadth-first, then reversed so leaves come first
        let mut order = Vec::new();
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        while let Some(pid) = queue.pop_front() {
            for &kid in children.get(&pid).into_iter().flatten() {
                if seen.insert(kid) {
                    order.push(kid);
                    queue.push_back(kid);
                }
            }
        }
        order.reverse();

        Self {
            root,
            descendants: order,
        }
    }

    pub fn descendants(&self) -> &[u32] {
        &self.descendants
    }

    /// Every member of the tree, children before the root
    pub fn kill_order(&self) -> impl Iterator<Item = u32> + '_ {
        self.descendants
            .iter()
            .copied()
            .chain(std::iter::once(self.root))
    }

    /// Number of processes including the root
    pub fn size(&self) -> usize {
        self.descendants.len() + 1
    }
}

/// What a teardown managed to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    /// Processes in the snapshot
    pub enumerated: usize,
    /// Kill signals delivered in the first pass
    pub killed: usize,
    /// Terminate signals delivered in the sweep
    pub swept: usize,
}

/// Kill `root` and all of its descendants. Never fails; problems are logged.
pub fn terminate_tree(root: u32) -> TerminationReport {
    let mut sys = System::new();
    sys.refresh_processes();
    let tree = ProcessTree::from_system(root, &sys);

    let mut report = TerminationReport {
        enumerated: tree.size(),
        ..Default::default()
    };
    let start_times: HashMap<u32, u64> = tree
        .kill_order()
        .filter_map(|pid| {
            sys.process(Pid::from_u32(pid))
                .map(|process| (pid, process.start_time()))
        })
        .collect();

    for pid in tree.kill_order() {
        match sys.process(Pid::from_u32(pid)) {
            Some(process) if process.kill() => report.killed += 1,
            Some(_) => debug!(pid, "kill signal not delivered"),
            None => debug!(pid, "process already gone"),
        }
    }

    for pid in tree.kill_order() {
        let sys_pid = Pid::from_u32(pid);
        if !sys.refresh_process(sys_pid) {
            continue;
        }
        let Some(process) = sys.process(sys_pid) else {
            continue;
        };
        if !same_process(&start_times, pid, process.start_time()) {
            debug!(pid, "pid reused since the snapshot, skipping");
            continue;
        }
        if !is_running(process) {
            continue;
        }
        match process.kill_with(Signal::Term) {
            Some(true) => report.swept += 1,
            Some(false) => debug!(pid, "terminate signal not delivered"),
            None => warn!(pid, "terminate signal unsupported on this platform"),
        }
    }

    debug!(
        root,
        enumerated = report.enumerated,
        killed = report.killed,
        swept = report.swept,
        "process tree terminated"
    );
    report
}

/// Whether `pid` exists and is not a zombie.
pub fn is_alive(pid: u32) -> bool {
    let mut sys = System::new();
    let sys_pid = Pid::from_u32(pid);
    if !sys.refresh_process(sys_pid) {
        return false;
    }
    sys.process(sys_pid).map(is_running).unwrap_or(false)
}

/// `pid` still names the process recorded in the snapshot
fn same_process(start_times: &HashMap<u32, u64>, pid: u32, start_time: u64) -> bool {
    start_times.get(&pid) == Some(&start_time)
}

fn is_running(process: &Process) -> bool {
    !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendants_deepest_first() {
        // 1 -> 2 -> 4, 1 -> 3, 5 unrelated
        let tree = ProcessTree::from_parent_links(1, [(2, 1), (3, 1), (4, 2), (5, 9)]);

        assert_eq!(tree.descendants(), &[4, 3, 2]);
        assert_eq!(tree.kill_order().collect::<Vec<_>>(), vec![4, 3, 2, 1]);
        assert_eq!(tree.size(), 4);
    }

    #[test]
    fn test_cycles_do_not_loop() {
        let tree = ProcessTree::from_parent_links(1, [(2, 1), (1, 2), (3, 3)]);
        assert_eq!(tree.descendants(), &[2]);
    }

    #[test]
    fn test_leaf_has_no_descendants() {
        let tree = ProcessTree::from_parent_links(7, [(2, 1)]);
        assert!(tree.descendants().is_empty());
        assert_eq!(tree.kill_order().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_reused_pid_is_not_the_same_process() {
        let start_times = HashMap::from([(10, 1_000), (11, 1_000)]);

        assert!(same_process(&start_times, 10, 1_000));
        assert!(!same_process(&start_times, 11, 1_005));
        assert!(!same_process(&start_times, 12, 1_000));
    }

    #[test]
    fn test_terminate_missing_pid_is_quiet() {
        // Above the largest pid_max Linux allows
        let report = terminate_tree(4_194_400);
        assert_eq!(report.killed, 0);
        assert_eq!(report.swept, 0);
        assert!(!is_alive(4_194_400));
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_sees_spawned_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let tree = ProcessTree::snapshot(std::process::id());
        assert!(tree.descendants().contains(&child.id()));

        let report = terminate_tree(child.id());
        assert_eq!(report.enumerated, 1);
        child.wait().unwrap();
        assert!(!is_alive(child.id()));
    }
}
