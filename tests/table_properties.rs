//! Property tests for the process table's handle discipline.

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;

use runnerd::proc::ProcessTable;
use runnerd::types::ExitKind;

/// One step of table usage, driven by arbitrary input.
#[derive(Debug, Clone)]
enum Op {
    Insert { detach: bool },
    Remove { pick: usize },
    RecordExit { pick: usize, code: i32 },
    Orphan { pick: usize },
    Sweep,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(|detach| Op::Insert { detach }),
        any::<usize>().prop_map(|pick| Op::Remove { pick }),
        (any::<usize>(), -128i32..128).prop_map(|(pick, code)| Op::RecordExit { pick, code }),
        any::<usize>().prop_map(|pick| Op::Orphan { pick }),
        Just(Op::Sweep),
    ]
}

proptest! {
    /// Handles are never reused, however inserts, removes, exits and sweeps
    /// interleave; removed handles stay invalid.
    #[test]
    fn handle_discipline_holds(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let table = ProcessTable::new();
        let mut ever_allocated = HashSet::new();
        let mut live = Vec::new();

        for op in ops {
            match op {
                Op::Insert { detach } => {
                    let handle = table.insert(None, detach);
                    prop_assert_ne!(handle, 0);
                    prop_assert!(ever_allocated.insert(handle), "handle {} reused", handle);
                    live.push(handle);
                }
                Op::Remove { pick } => {
                    if live.is_empty() { continue; }
                    let handle = live.remove(pick % live.len());
                    prop_assert!(table.remove(handle).is_some());
                    // Idempotent: gone means gone.
                    prop_assert!(table.remove(handle).is_none());
                    prop_assert!(table.subscribe(handle).is_none());
                }
                Op::RecordExit { pick, code } => {
                    if live.is_empty() { continue; }
                    let handle = live[pick % live.len()];
                    table.record_exit(handle, ExitKind::Code(code));
                    prop_assert!(table.subscribe(handle).is_some());
                }
                Op::Orphan { pick } => {
                    if live.is_empty() { continue; }
                    table.mark_orphaned(live[pick % live.len()]);
                }
                Op::Sweep => {
                    // Generous TTL: nothing just exited is old enough, so a
                    // sweep here never invalidates the `live` model.
                    table.sweep(Duration::from_secs(3600));
                }
            }
        }

        // Everything the model considers live is still subscribable.
        for handle in &live {
            prop_assert!(table.subscribe(*handle).is_some());
        }
        prop_assert_eq!(table.len(), live.len());
    }
}
