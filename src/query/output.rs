use std::io::IsTerminal;

use crate::cli::OutputFormat;
use crate::graph::metrics::DescendantHunks;
use crate::graph::node::HierarchyNode;
use crate::query::chapters::{Chapter, ChapterView};
use crate::query::cluster::Communities;
use crate::query::find::FindResult;
use crate::query::narrative::Narrative;
use crate::query::stats::HierarchyStats;

fn bold(text: &str, use_color: bool) -> String {
    if use_color {
        format!("\x1b[1m{text}\x1b[0m")
    } else {
        text.to_owned()
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Format and print hierarchy stats to stdout according to the selected output format.
pub fn format_stats(stats: &HierarchyStats, format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            println!(
                "nodes {} hunks {} aggregators {}",
                stats.node_count, stats.hunks, stats.aggregators
            );
            let types: Vec<String> = stats
                .nodes_by_type
                .iter()
                .map(|(t, n)| format!("{t} {n}"))
                .collect();
            println!("{}", types.join(" "));
            let edges: Vec<String> = stats
                .edges_by_type
                .iter()
                .map(|(t, n)| format!("{t} {n}"))
                .collect();
            println!("edges {} {}", stats.edge_count, edges.join(" "));
            println!(
                "story {} generated {}",
                stats.story_length, stats.generated_nodes
            );
        }

        OutputFormat::Table => {
            let use_color = std::io::stdout().is_terminal();
            println!("{}", bold("NODES", use_color));
            for (t, n) in &stats.nodes_by_type {
                println!("  {:<18} {:>6}", t, n);
            }
            println!("  {:<18} {:>6}", "total", stats.node_count);
            println!("{}", bold("EDGES", use_color));
            for (t, n) in &stats.edges_by_type {
                println!("  {:<18} {:>6}", t, n);
            }
            println!("  {:<18} {:>6}", "total", stats.edge_count);
            println!("{}", bold("NARRATIVE", use_color));
            println!("  {:<18} {:>6}", "chapters", stats.story_length);
            println!("  {:<18} {:>6}", "generated nodes", stats.generated_nodes);
        }

        OutputFormat::Json => match serde_json::to_value(stats) {
            Ok(value) => print_json(&value),
            Err(e) => eprintln!("error serialising stats: {e}"),
        },
    }
}

/// Format and print the linear story. `current` marks the selected chapter, if any.
pub fn format_story(narrative: &Narrative, current: Option<usize>, format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for (pos, id) in narrative.story.iter().enumerate() {
                let marker = if current == Some(pos) { "*" } else { " " };
                let represented = narrative.represented_by(id);
                if represented.is_empty() {
                    println!("{marker}{pos} {id}");
                } else {
                    println!("{marker}{pos} {id} (represents {})", represented.join(","));
                }
            }
            println!("{} chapters", narrative.len());
        }

        OutputFormat::Table => {
            let use_color = std::io::stdout().is_terminal();
            let id_w = narrative
                .story
                .iter()
                .map(String::len)
                .max()
                .unwrap_or(7)
                .max(7);
            println!(
                "{}",
                bold(
                    &format!("{:>4}  {:<id_w$}  {}", "#", "CHAPTER", "REPRESENTS"),
                    use_color
                )
            );
            println!("{}", "-".repeat(id_w + 18));
            for (pos, id) in narrative.story.iter().enumerate() {
                let line = format!(
                    "{:>4}  {:<id_w$}  {}",
                    pos,
                    id,
                    narrative.represented_by(id).join(", ")
                );
                if current == Some(pos) {
                    println!("{}", bold(&line, use_color));
                } else {
                    println!("{line}");
                }
            }
        }

        OutputFormat::Json => print_json(&serde_json::json!({
            "story": narrative.story,
            "represents": narrative.represents,
            "current": current,
        })),
    }
}

fn print_chapter_tree(chapters: &[Chapter], depth: usize) {
    for chapter in chapters {
        let represents = chapter
            .represents
            .as_ref()
            .map(|r| format!(" (represents {})", r.join(",")))
            .unwrap_or_default();
        println!("{}{}{}", "  ".repeat(depth), chapter.node_id, represents);
        // A root's own entry is repeated last in its sub-story; skip re-nesting it.
        let nested: Vec<Chapter> = chapter
            .sub_story
            .iter()
            .filter(|c| c.node_id != chapter.node_id)
            .cloned()
            .collect();
        print_chapter_tree(&nested, depth + 1);
    }
}

/// Format and print one or more pruned stories.
pub fn format_chapters(views: &[(ChapterView, &[Chapter])], format: &OutputFormat) {
    match format {
        OutputFormat::Compact | OutputFormat::Table => {
            let use_color =
                matches!(format, OutputFormat::Table) && std::io::stdout().is_terminal();
            for (view, chapters) in views {
                let name = serde_json::to_value(view)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default();
                let roots = chapters.iter().filter(|c| !c.sub_story.is_empty()).count();
                println!(
                    "{}",
                    bold(&format!("[{name}] {roots} roots, {} chapters", chapters.len()), use_color)
                );
                print_chapter_tree(chapters, 1);
            }
        }

        OutputFormat::Json => {
            let mut map = serde_json::Map::new();
            for (view, chapters) in views {
                let key = serde_json::to_value(view)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default();
                map.insert(key, serde_json::to_value(chapters).unwrap_or_default());
            }
            print_json(&serde_json::Value::Object(map));
        }
    }
}

/// Format and print a community partition. Members are shown by node id.
pub fn format_clusters(result: &Communities, ids: &[&str], format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for (label, members) in result.communities.iter().enumerate() {
                let names: Vec<&str> = members.iter().map(|&m| ids[m]).collect();
                println!("community {} [{}] {}", label, members.len(), names.join(" "));
            }
            println!(
                "{} communities modularity {:.6}",
                result.communities.len(),
                result.modularity
            );
        }

        OutputFormat::Table => {
            let use_color = std::io::stdout().is_terminal();
            println!(
                "{}",
                bold(&format!("{:>9}  {:>7}  {}", "COMMUNITY", "SIZE", "MEMBERS"), use_color)
            );
            for (label, members) in result.communities.iter().enumerate() {
                let names: Vec<&str> = members.iter().map(|&m| ids[m]).collect();
                println!("{:>9}  {:>7}  {}", label, members.len(), names.join(", "));
            }
            println!("modularity {:.6}", result.modularity);
        }

        OutputFormat::Json => {
            let communities: Vec<Vec<&str>> = result
                .communities
                .iter()
                .map(|members| members.iter().map(|&m| ids[m]).collect())
                .collect();
            print_json(&serde_json::json!({
                "partition": result.partition,
                "communities": communities,
                "modularity": result.modularity,
            }));
        }
    }
}

/// Format and print a node summary for `inspect`.
pub fn format_inspect(
    node: &HierarchyNode,
    branch_weight: usize,
    descendants: &DescendantHunks,
    format: &OutputFormat,
) {
    let location = node
        .hunk()
        .map(|h| format!("{}:{}-{}", h.file_path, h.start_line, h.end_line));
    match format {
        OutputFormat::Compact | OutputFormat::Table => {
            println!("{} {}", node.node_type().as_str(), node.id);
            if let Some(title) = &node.title {
                println!("title {title}");
            }
            if let Some(location) = &location {
                println!("at {location}");
            }
            if !node.aggregator_ids.is_empty() {
                println!("parents {}", node.aggregator_ids.join(" "));
            }
            println!("branch-weight {branch_weight}");
            println!("first-generation {}", descendants.first_generation.join(" "));
            println!(
                "extended-generations {}",
                descendants.extended_generations.join(" ")
            );
        }

        OutputFormat::Json => print_json(&serde_json::json!({
            "id": node.id,
            "nodeType": node.node_type().as_str(),
            "title": node.title,
            "description": node.description,
            "location": location,
            "aggregatorIds": node.aggregator_ids,
            "branchWeight": branch_weight,
            "descendants": descendants,
        })),
    }
}

/// Format and print a dependency closure.
pub fn format_deps(id: &str, closure: &[String], format: &OutputFormat) {
    match format {
        OutputFormat::Compact | OutputFormat::Table => {
            for dep in closure {
                println!("dep {dep}");
            }
            println!("{} dependencies of {}", closure.len(), id);
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "id": id,
            "dependencies": closure,
        })),
    }
}

/// Format and print `find` results.
pub fn format_find_results(results: &[FindResult], format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for r in results {
                let mut line = format!("{} {}", r.node_type.as_str(), r.id);
                if let Some(location) = &r.location {
                    line.push_str(&format!(" {location}"));
                }
                if let Some(title) = &r.title {
                    line.push_str(&format!(" \"{title}\""));
                }
                println!("{line}");
            }
            println!("{} nodes found", results.len());
        }

        OutputFormat::Table => {
            let use_color = std::io::stdout().is_terminal();
            let id_w = results.iter().map(|r| r.id.len()).max().unwrap_or(2).max(2);
            println!(
                "{}",
                bold(
                    &format!("{:<16}  {:<id_w$}  {}", "TYPE", "ID", "LOCATION / TITLE"),
                    use_color
                )
            );
            for r in results {
                let detail = r
                    .location
                    .clone()
                    .or_else(|| r.title.clone())
                    .unwrap_or_default();
                println!("{:<16}  {:<id_w$}  {}", r.node_type.as_str(), r.id, detail);
            }
        }

        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id,
                        "nodeType": r.node_type.as_str(),
                        "title": r.title,
                        "location": r.location,
                    })
                })
                .collect();
            print_json(&serde_json::Value::Array(json_results));
        }
    }
}
