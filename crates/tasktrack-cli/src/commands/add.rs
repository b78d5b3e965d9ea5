use crate::support::{Context, EXIT_FAILURE, EXIT_INVALID_ARGUMENT, fail, item_json, print_json};
use serde_json::json;
use tasktrack_core::{ItemId, ItemKind, Status};

pub struct Args {
    pub kind: ItemKind,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub epic: Option<ItemId>,
    pub json: bool,
}

pub fn run(ctx: &Context, args: Args) {
    let Args {
        kind,
        name,
        description,
        status,
        epic,
        json: json_output,
    } = args;

    let parent = match (kind, epic) {
        (ItemKind::Subtask, Some(epic_id)) => Some(epic_id),
        (ItemKind::Subtask, None) => fail(EXIT_INVALID_ARGUMENT, "subtasks need --epic <ID>"),
        (_, Some(_)) => fail(EXIT_INVALID_ARGUMENT, "--epic only applies to subtasks"),
        (_, None) => None,
    };

    let created = ctx.mutate_or_exit(|store| {
        let id = match (kind, parent) {
            (ItemKind::Epic, _) => store.create_epic(name, description),
            (_, Some(epic_id)) => store.create_subtask(epic_id, name, description, status)?,
            (_, None) => store.create_task(name, description, status),
        };
        let rendered = store
            .find(id)
            .map(|item| (item_json(item), ctx.item_line(item)));
        Ok((rendered, true))
    });
    let Some((payload, line)) = created else {
        fail(EXIT_FAILURE, "created item missing from store");
    };

    if json_output {
        print_json(&json!({
            "action": format!("{kind}.add"),
            "storePath": ctx.store_display(),
            "item": payload
        }));
    } else {
        println!(
            "tasktrack add {kind}\n  Added:\n{line}\n  Path: {}",
            ctx.store_display()
        );
    }
}
