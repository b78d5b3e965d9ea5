use crate::support::{Context, EXIT_INVALID_ARGUMENT, fail, item_json, print_json};
use serde_json::json;
use tasktrack_core::{ItemId, Status};

pub fn run(
    ctx: &Context,
    id: ItemId,
    name: Option<String>,
    description: Option<String>,
    status: Option<Status>,
    json_output: bool,
) {
    if name.is_none() && description.is_none() && status.is_none() {
        fail(
            EXIT_INVALID_ARGUMENT,
            "nothing to update (pass --name, --description or --status)",
        );
    }

    let (payload, line) = ctx.mutate_or_exit(|store| {
        if let Some(name) = name {
            store.update_name(id, name)?;
        }
        if let Some(description) = description {
            store.update_description(id, description)?;
        }
        if let Some(status) = status {
            store.update_status(id, status)?;
        }
        let rendered = store
            .find(id)
            .map(|item| (item_json(item), ctx.item_line(item)))
            .unwrap_or_default();
        Ok((rendered, true))
    });

    if json_output {
        print_json(&json!({
            "action": "item.update",
            "storePath": ctx.store_display(),
            "item": payload
        }));
    } else {
        println!("tasktrack update {id}\n  Updated:\n{line}");
    }
}
