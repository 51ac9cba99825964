use std::error::Error;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use polars::prelude::{AnyValue, DataFrame};
use site_schedule::{
    ChangeSet, GanttFeed, NewTask, ProjectMetadata, Schedule, TaskId, TaskPatch, TaskStatus,
    TradeType, WeekendStartPolicy,
    config::{AppConfig, init_tracing},
    persistence::{
        load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv,
        save_schedule_to_json,
    },
    task_frame,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

fn cell_text(name: &str, av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::List(inner) if name == "depends_on" => {
            if let Ok(ca) = inner.u32() {
                ca.into_iter()
                    .flatten()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            } else {
                av.to_string()
            }
        }
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| {
                col.get(row_idx)
                    .map(|av| cell_text(col.name(), &av))
                    .unwrap_or_default()
            })
            .collect();
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_schedule(schedule: &Schedule) -> String {
    match task_frame(schedule) {
        Ok(df) => render_df_as_text_table(&df),
        Err(e) => format!("Error rendering schedule: {e}"),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                                   Show this help\n  show                                   Show current schedule\n  add <name> <YYYY-MM-DD> <days> [preds] Add a task (preds like 1,2)\n  move <task> <YYYY-MM-DD>               Move a task to a new start\n  resize <task> <days>                   Change a task's duration\n  status <task> <status>                 not_started|in_progress|completed|delayed\n  trade <task> <trade>                   Set trade type (e.g. electrical)\n  rename <task> <name...>                Rename a task\n  assign <task> [who...]                 Set or clear assignee\n  notes <task> [text...]                 Set or clear notes\n  link <pred> <succ>                     succ waits for pred to finish\n  unlink <pred> <succ>                   Remove a dependency\n  delete <task>                          Delete a task\n  shift <task>                           Push dependents after <task>\n  violations                             List broken dependencies\n  summary                                Project summary\n  gantt                                  Print the Gantt feed as JSON\n  meta name <text...>                    Set project name\n  meta dates <start> <estimate>          Set project start and estimated completion\n  calendar workdays <Mon,Tue,...>        Set working weekdays\n  calendar holiday <YYYY-MM-DD>          Add a holiday\n  calendar weekend <snap|anchor>         Weekend start policy\n  save json|csv <path>                   Save a snapshot\n  load json|csv <path>                   Load a snapshot\n  quit|exit                              Exit\n\n<task> is a row number from 'show' or a task id."
    );
}

/// Row number (1-based, as shown by `show`) or a full task id.
fn resolve_task(schedule: &Schedule, reference: &str) -> CliResult<TaskId> {
    if let Ok(row) = reference.parse::<usize>() {
        return schedule
            .tasks()
            .get(row.wrapping_sub(1))
            .map(|task| task.id)
            .ok_or_else(|| format!("no task in row {row}").into());
    }
    Ok(TaskId::from_str(reference)?)
}

fn parse_date(input: &str) -> CliResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{input}' (YYYY-MM-DD)").into())
}

fn parse_days(input: &str) -> CliResult<u32> {
    input
        .parse::<u32>()
        .map_err(|_| format!("Invalid duration '{input}'").into())
}

fn parse_weekdays(input: &str) -> CliResult<Vec<Weekday>> {
    input
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim()
                .parse::<Weekday>()
                .map_err(|_| format!("Invalid weekday '{part}'").into())
        })
        .collect()
}

fn report(label: &str, schedule: &Schedule, changes: &ChangeSet) {
    println!("{label}\n{}", render_schedule(schedule));
    for violation in &changes.violations {
        println!("Warning: {violation}");
    }
}

fn usage(text: &str) -> CliResult<()> {
    Err(format!("Usage: {text}").into())
}

fn execute(schedule: &mut Schedule, cmd: &str, args: &[&str]) -> CliResult<()> {
    match (cmd, args) {
        ("show", _) => println!("{}", render_schedule(schedule)),
        ("add", [name, date, days, rest @ ..]) => {
            let mut new_task = NewTask::new(*name, parse_date(date)?, parse_days(days)?);
            if let Some(preds) = rest.first() {
                let ids = preds
                    .split(',')
                    .filter(|p| !p.trim().is_empty())
                    .map(|p| resolve_task(schedule, p.trim()))
                    .collect::<CliResult<Vec<_>>>()?;
                new_task = new_task.after(ids);
            }
            let changes = schedule.add_task(new_task)?;
            report("Task added.", schedule, &changes);
        }
        ("add", _) => usage("add <name> <YYYY-MM-DD> <days> [preds_csv]")?,
        ("move", [task, date]) => {
            let id = resolve_task(schedule, task)?;
            let changes = schedule.move_task(id, parse_date(date)?, None)?;
            report("Task moved.", schedule, &changes);
        }
        ("move", _) => usage("move <task> <YYYY-MM-DD>")?,
        ("resize", [task, days]) => {
            let id = resolve_task(schedule, task)?;
            let changes = schedule.resize_task(id, parse_days(days)?, None)?;
            report("Task resized.", schedule, &changes);
        }
        ("resize", _) => usage("resize <task> <days>")?,
        ("status", [task, status]) => {
            let id = resolve_task(schedule, task)?;
            let changes = schedule.set_status(id, TaskStatus::from_str(status)?, None)?;
            report("Status set.", schedule, &changes);
        }
        ("status", _) => usage("status <task> <not_started|in_progress|completed|delayed>")?,
        ("trade", [task, trade]) => {
            let id = resolve_task(schedule, task)?;
            let patch = TaskPatch {
                trade_type: Some(TradeType::from_str(trade)?),
                ..TaskPatch::default()
            };
            let changes = schedule.update_task(id, patch, None)?;
            report("Trade set.", schedule, &changes);
        }
        ("trade", _) => usage("trade <task> <trade>")?,
        ("rename", [task, name @ ..]) if !name.is_empty() => {
            let id = resolve_task(schedule, task)?;
            let patch = TaskPatch {
                name: Some(name.join(" ")),
                ..TaskPatch::default()
            };
            let changes = schedule.update_task(id, patch, None)?;
            report("Task renamed.", schedule, &changes);
        }
        ("rename", _) => usage("rename <task> <name...>")?,
        ("assign", [task, who @ ..]) => {
            let id = resolve_task(schedule, task)?;
            let patch = TaskPatch {
                assigned_to: Some(who.join(" ")),
                ..TaskPatch::default()
            };
            let changes = schedule.update_task(id, patch, None)?;
            report("Assignee set.", schedule, &changes);
        }
        ("assign", _) => usage("assign <task> [who...]")?,
        ("notes", [task, text @ ..]) => {
            let id = resolve_task(schedule, task)?;
            let patch = TaskPatch {
                notes: Some(text.join(" ")),
                ..TaskPatch::default()
            };
            let changes = schedule.update_task(id, patch, None)?;
            report("Notes set.", schedule, &changes);
        }
        ("notes", _) => usage("notes <task> [text...]")?,
        ("link", [pred, succ]) => {
            let pred = resolve_task(schedule, pred)?;
            let succ = resolve_task(schedule, succ)?;
            let changes = schedule.create_dependency(pred, succ, None)?;
            report("Dependency added.", schedule, &changes);
        }
        ("link", _) => usage("link <pred> <succ>")?,
        ("unlink", [pred, succ]) => {
            let pred = resolve_task(schedule, pred)?;
            let succ = resolve_task(schedule, succ)?;
            let changes = schedule.remove_dependency(pred, succ, None)?;
            report("Dependency removed.", schedule, &changes);
        }
        ("unlink", _) => usage("unlink <pred> <succ>")?,
        ("delete", [task]) => {
            let id = resolve_task(schedule, task)?;
            let changes = schedule.remove_task(id, None)?;
            report(&format!("Deleted task {task}."), schedule, &changes);
        }
        ("delete", _) => usage("delete <task>")?,
        ("shift", [task]) => {
            let id = resolve_task(schedule, task)?;
            let changes = schedule.shift_dependents(id, None)?;
            report(
                &format!("Shifted {} dependent task(s).", changes.updated.len()),
                schedule,
                &changes,
            );
        }
        ("shift", _) => usage("shift <task>")?,
        ("violations", _) => {
            let violations = schedule.dependency_violations();
            if violations.is_empty() {
                println!("No dependency violations.");
            }
            for violation in violations {
                println!("{violation}");
            }
        }
        ("summary", _) => println!("{}", schedule.summary().to_cli_summary()),
        ("gantt", _) => {
            println!("{}", serde_json::to_string_pretty(&GanttFeed::from_schedule(schedule))?);
        }
        ("meta", ["name", name @ ..]) if !name.is_empty() => {
            let mut metadata = schedule.metadata().clone();
            metadata.project_name = name.join(" ");
            schedule.set_metadata(metadata)?;
            println!("Project name set.");
        }
        ("meta", ["dates", start, estimate]) => {
            let metadata = ProjectMetadata {
                start_date: Some(parse_date(start)?),
                estimated_completion_date: Some(parse_date(estimate)?),
                ..schedule.metadata().clone()
            };
            schedule.set_metadata(metadata)?;
            println!("Project dates set.");
        }
        ("meta", _) => usage("meta name <text...> | meta dates <start> <estimate>")?,
        ("calendar", [sub, value]) => {
            let mut calendar = schedule.calendar().clone();
            match *sub {
                "workdays" => calendar.set_working_days(&parse_weekdays(value)?)?,
                "holiday" => calendar.add_holiday(parse_date(value)?),
                "weekend" => calendar.set_weekend_start(match *value {
                    "snap" => WeekendStartPolicy::SnapForward,
                    "anchor" => WeekendStartPolicy::AnchorInPlace,
                    _ => return usage("calendar weekend <snap|anchor>"),
                }),
                _ => return usage("calendar workdays|holiday|weekend <value>"),
            }
            let changes = schedule.set_calendar(calendar)?;
            report(
                &format!("Calendar updated; {} task(s) rescheduled.", changes.updated.len()),
                schedule,
                &changes,
            );
        }
        ("calendar", _) => usage("calendar workdays|holiday|weekend <value>")?,
        ("save", [format, path]) => {
            match *format {
                "json" => save_schedule_to_json(schedule, path)?,
                "csv" => save_schedule_to_csv(schedule, path)?,
                _ => return usage("save json|csv <path>"),
            }
            println!("Schedule saved to {path}.");
        }
        ("save", _) => usage("save json|csv <path>")?,
        ("load", [format, path]) => {
            *schedule = match *format {
                "json" => load_schedule_from_json(path)?,
                "csv" => load_schedule_from_csv(path)?,
                _ => return usage("load json|csv <path>"),
            };
            println!("Schedule loaded from {path}.\n{}", render_schedule(schedule));
        }
        ("load", _) => usage("load json|csv <path>")?,
        _ => println!("Unknown command. Type 'help'."),
    }
    Ok(())
}

fn main() -> CliResult<()> {
    init_tracing("warn");
    let config = AppConfig::from_env()?;
    let calendar = config.load_calendar()?;
    let metadata = match config.project_id {
        Some(project_id) => ProjectMetadata::new(project_id, "New Project"),
        None => ProjectMetadata::default(),
    };
    let mut schedule = Schedule::new(metadata, calendar);

    println!("Site Schedule (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            _ => {
                if let Err(e) = execute(&mut schedule, cmd, &args) {
                    println!("Error: {e}");
                }
            }
        }
    }
    Ok(())
}
