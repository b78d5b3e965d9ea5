use crate::support::{Context, print_json};
use serde_json::json;
use tasktrack_core::{ItemId, ItemKind};

pub fn run_delete(ctx: &Context, kind: ItemKind, id: ItemId, json_output: bool) {
    let deleted = ctx.mutate_or_exit(|store| {
        let deleted = store.delete(kind, id);
        Ok((deleted, deleted))
    });

    if json_output {
        print_json(&json!({
            "action": format!("{kind}.delete"),
            "storePath": ctx.store_display(),
            "id": id,
            "deleted": deleted
        }));
    } else if deleted {
        println!("tasktrack delete {kind} {id}\n  Deleted");
    } else {
        println!("tasktrack delete {kind} {id}\n  No such {kind}");
    }
}

pub fn run_clear(ctx: &Context, kind: ItemKind, json_output: bool) {
    let removed = ctx.mutate_or_exit(|store| {
        let before = store.len();
        store.delete_all(kind);
        let removed = before - store.len();
        Ok((removed, removed > 0))
    });

    if json_output {
        print_json(&json!({
            "action": format!("{kind}.clear"),
            "storePath": ctx.store_display(),
            "removed": removed
        }));
    } else {
        println!("tasktrack clear {kind}\n  Removed: {removed}");
    }
}
