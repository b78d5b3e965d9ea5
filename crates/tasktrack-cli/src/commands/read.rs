//! Read commands. Only `get` touches the file: it records the access in
//! the persisted history.

use crate::support::{Context, exit_code, fail, item_json, items_json, print_json};
use serde_json::json;
use tasktrack_core::{Item, ItemId, ItemKind};

pub fn run_get(ctx: &Context, kind: ItemKind, id: ItemId, json_output: bool) {
    let (payload, line) = ctx.mutate_or_exit(|store| {
        let item = store.get(kind, id)?;
        Ok(((item_json(item), ctx.item_line(item)), true))
    });

    if json_output {
        print_json(&json!({
            "action": format!("{kind}.get"),
            "storePath": ctx.store_display(),
            "item": payload
        }));
    } else {
        println!("tasktrack get {kind} {id}\n{line}");
    }
}

pub fn run_list(ctx: &Context, kind: ItemKind, json_output: bool) {
    let store = ctx.load_store_or_exit();
    let items = store.list(kind);
    print_items(ctx, &format!("{kind}.list"), &format!("list {kind}"), &items, json_output);
}

pub fn run_subtasks(ctx: &Context, epic_id: ItemId, json_output: bool) {
    let store = ctx.load_store_or_exit();
    let items = store
        .subtasks_of(epic_id)
        .unwrap_or_else(|err| fail(exit_code(err.kind()), err));
    print_items(
        ctx,
        "epic.subtasks",
        &format!("subtasks {epic_id}"),
        &items,
        json_output,
    );
}

pub fn run_history(ctx: &Context, json_output: bool) {
    let store = ctx.load_store_or_exit();
    let items = store.history();
    print_items(ctx, "history", "history", &items, json_output);
}

pub(crate) fn print_items(
    ctx: &Context,
    action: &str,
    title: &str,
    items: &[&Item],
    json_output: bool,
) {
    if json_output {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "count": items.len(),
            "items": items_json(items)
        }));
    } else {
        println!(
            "tasktrack {title}\n  Path: {}\n  Count: {}",
            ctx.store_display(),
            items.len()
        );
        for item in items {
            println!("{}", ctx.item_line(item));
        }
    }
}
