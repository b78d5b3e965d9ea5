use crate::commands::read::print_items;
use crate::support::{Context, item_json, minutes_or_exit, print_json};
use chrono::TimeDelta;
use serde_json::json;
use tasktrack_core::ItemId;

pub fn run_schedule(ctx: &Context, id: ItemId, start: &str, minutes: i64, json_output: bool) {
    let start = ctx.parse_time_or_exit(start);
    let duration = minutes_or_exit(minutes);

    let (payload, line) = ctx.mutate_or_exit(|store| {
        store.set_time_window(id, Some(start), duration)?;
        let rendered = store
            .find(id)
            .map(|item| (item_json(item), ctx.item_line(item)))
            .unwrap_or_default();
        Ok((rendered, true))
    });

    if json_output {
        print_json(&json!({
            "action": "item.schedule",
            "storePath": ctx.store_display(),
            "item": payload
        }));
    } else {
        println!("tasktrack schedule {id}\n  Scheduled:\n{line}");
    }
}

pub fn run_unschedule(ctx: &Context, id: ItemId, json_output: bool) {
    let was_scheduled = ctx.mutate_or_exit(|store| {
        let was_scheduled = store.is_in_schedule(id);
        store.set_time_window(id, None, TimeDelta::zero())?;
        Ok((was_scheduled, was_scheduled))
    });

    if json_output {
        print_json(&json!({
            "action": "item.unschedule",
            "storePath": ctx.store_display(),
            "id": id,
            "changed": was_scheduled
        }));
    } else if was_scheduled {
        println!("tasktrack unschedule {id}\n  Window cleared");
    } else {
        println!("tasktrack unschedule {id}\n  Not scheduled");
    }
}

pub fn run_prioritized(ctx: &Context, descending: bool, json_output: bool) {
    let store = ctx.load_store_or_exit();
    let items = store.list_by_priority(!descending);
    let order = if descending { "descending" } else { "ascending" };
    print_items(
        ctx,
        "schedule.prioritized",
        &format!("prioritized ({order})"),
        &items,
        json_output,
    );
}

pub fn run_overlaps(ctx: &Context, start: &str, minutes: i64, json_output: bool) {
    let start = ctx.parse_time_or_exit(start);
    let duration = minutes_or_exit(minutes);
    let store = ctx.load_store_or_exit();
    let overlapping = store.is_overlapping(Some(start), duration);

    if json_output {
        print_json(&json!({
            "action": "schedule.overlaps",
            "storePath": ctx.store_display(),
            "start": start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "durationMinutes": minutes,
            "overlapping": overlapping
        }));
    } else {
        println!(
            "tasktrack overlaps\n  Window: {} +{minutes}m\n  Overlapping: {}",
            ctx.format_time(start),
            if overlapping { "yes" } else { "no" }
        );
    }
}
