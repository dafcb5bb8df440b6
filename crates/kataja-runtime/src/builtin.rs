#![forbid(unsafe_code)]

//! The commands every engine starts with.
//!
//! Per-type commands (`add_gloss_node`, `edit_feature_color`, ...) share one
//! body each; the node type travels in [`Invocation::bound`].

use kataja_core::Viewport;
use kataja_forest::{Alignment, EdgeType, NodeId, NodeType, Signal};

use crate::command::{Command, Invocation};
use crate::engine::{HostRequest, Kataja};
use crate::error::Result;

/// All built-in commands, in registration order.
pub(crate) fn commands<V: Viewport>() -> Vec<Command<V>> {
    let mut out = vec![
        Command::new("undo", undo)
            .shortcut("Ctrl+Z")
            .enabled_when(|k: &Kataja<V>| k.forest().undo_manager().can_undo()),
        Command::new("redo", redo)
            .shortcut("Ctrl+Shift+Z")
            .enabled_when(|k: &Kataja<V>| k.forest().undo_manager().can_redo()),
        Command::new("next_forest", next_forest)
            .shortcut("Right")
            .enabled_when(|k: &Kataja<V>| k.forests().len() > 1),
        Command::new("previous_forest", previous_forest)
            .shortcut("Left")
            .enabled_when(|k: &Kataja<V>| k.forests().len() > 1),
        Command::new("new_forest", new_forest).shortcut("Ctrl+N"),
        Command::new("toggle_fold_node", toggle_fold_node).undoable(),
        Command::new("delete_node", delete_node).shortcut("Delete").undoable(),
        Command::new("merge_nodes", merge_nodes).undoable(),
        Command::new("change_visualization", change_visualization),
        Command::new("toggle_brackets", toggle_brackets).shortcut("B"),
        Command::new("toggle_traces", toggle_traces)
            .shortcut("T")
            .checkable(|k: &Kataja<V>| !k.forest().settings().multidomination),
        Command::new("toggle_magnets", toggle_magnets).checkable(|k: &Kataja<V>| k.forest().settings().magnets),
        Command::new("show_merge_order", show_merge_order)
            .checkable(|k: &Kataja<V>| k.forest().settings().show_merge_order),
        Command::new("show_select_order", show_select_order)
            .checkable(|k: &Kataja<V>| k.forest().settings().show_select_order),
        Command::new("toggle_fullscreen", toggle_fullscreen)
            .shortcut("F11")
            .checkable(|k: &Kataja<V>| k.is_fullscreen()),
        Command::new("fit_to_window", fit_to_window).shortcut("Z"),
        Command::new("print_pdf", print_pdf).shortcut("Ctrl+P"),
    ];
    for t in NodeType::ALL {
        out.push(Command::new(format!("add_{}_node", t.name()), add_node).undoable().for_node_type(t));
        out.push(Command::new(format!("edit_{}_color", t.name()), edit_color).for_node_type(t));
        out.push(Command::new(format!("select_{}_font", t.name()), select_font).for_node_type(t));
    }
    out
}

/// The node named in the arguments, else the current selection.
fn targets<V: Viewport>(k: &Kataja<V>, inv: &Invocation<'_>) -> Result<Vec<NodeId>> {
    let nodes: Vec<NodeId> = match inv.args.node {
        Some(n) => vec![n],
        None => k.forest().selection().nodes().collect(),
    };
    if nodes.is_empty() {
        return Err(inv.missing("node"));
    }
    Ok(nodes)
}

fn undo<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let label = k.forest_mut().undo()?;
    Ok(format!("Undo: {label}"))
}

fn redo<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let label = k.forest_mut().redo()?;
    Ok(format!("Redo: {label}"))
}

fn next_forest<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let i = k.next_forest();
    Ok(format!("Forest {}/{}", i + 1, k.forests().len()))
}

fn previous_forest<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let i = k.previous_forest();
    Ok(format!("Forest {}/{}", i + 1, k.forests().len()))
}

fn new_forest<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let i = k.new_forest();
    Ok(format!("New forest {}", i + 1))
}

fn toggle_fold_node<V: Viewport>(k: &mut Kataja<V>, inv: &Invocation<'_>) -> Result<String> {
    let nodes = targets(k, inv)?;
    let forest = k.forest_mut();
    let mut folded = 0;
    for &id in &nodes {
        if forest.is_folded(id) {
            forest.unfold(id)?;
        } else {
            forest.fold(id)?;
            folded += 1;
        }
    }
    Ok(match (folded, nodes.len()) {
        (0, 1) => format!("Unfolded {}", nodes[0]),
        (1, 1) => format!("Folded {}", nodes[0]),
        (f, n) => format!("Folded {f} of {n} nodes"),
    })
}

fn delete_node<V: Viewport>(k: &mut Kataja<V>, inv: &Invocation<'_>) -> Result<String> {
    let nodes = targets(k, inv)?;
    for &id in &nodes {
        k.forest_mut().remove_node(id)?;
    }
    Ok(match nodes.as_slice() {
        [one] => format!("Deleted {one}"),
        many => format!("Deleted {} nodes", many.len()),
    })
}

/// Put a new constituent above the first two selected nodes, the first
/// on the left. The new node is labelled after the left one.
fn merge_nodes<V: Viewport>(k: &mut Kataja<V>, inv: &Invocation<'_>) -> Result<String> {
    let selected: Vec<NodeId> = k.forest().selection().nodes().take(2).collect();
    let &[left, right] = selected.as_slice() else {
        return Err(inv.missing("second selected node"));
    };
    let label = k.forest().node(left).map(|n| n.label.clone()).unwrap_or_default();
    let forest = k.forest_mut();
    let merged = forest.create_node(NodeType::Constituent, &label);
    let connected = forest
        .connect(merged, left, EdgeType::Constituent, Alignment::Left)
        .and_then(|_| forest.connect(merged, right, EdgeType::Constituent, Alignment::Right));
    if let Err(e) = connected {
        forest.remove_node(merged)?;
        return Err(e.into());
    }
    forest.select(merged)?;
    Ok(format!("Merged {left} and {right}"))
}

fn change_visualization<V: Viewport>(k: &mut Kataja<V>, inv: &Invocation<'_>) -> Result<String> {
    let name = match inv.args.text.as_deref() {
        Some(name) => name.to_string(),
        None => {
            let current = k
                .forest()
                .engine_name()
                .unwrap_or(kataja_layout::VISUALIZATIONS[0]);
            kataja_layout::next_visualization(current).to_string()
        }
    };
    k.change_visualization(&name)?;
    Ok(format!("Visualization: {name}"))
}

fn toggle_brackets<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let style = k.forest_mut().cycle_brackets();
    Ok(format!("Brackets: {style:?}"))
}

fn toggle_traces<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let shared = k.forest_mut().toggle_multidomination();
    let shown = if shared { "multidomination" } else { "traces" };
    Ok(format!("Showing {shown}"))
}

fn on_off(what: &str, on: bool) -> String {
    format!("{what}: {}", if on { "on" } else { "off" })
}

fn toggle_magnets<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    Ok(on_off("Edge magnets", k.forest_mut().toggle_magnets()))
}

fn show_merge_order<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    Ok(on_off("Merge order", k.forest_mut().toggle_merge_order()))
}

fn show_select_order<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    Ok(on_off("Select order", k.forest_mut().toggle_select_order()))
}

fn toggle_fullscreen<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    Ok(on_off("Fullscreen", k.toggle_fullscreen()))
}

fn fit_to_window<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    let rect = k.forest().state().bounding_rect();
    k.request(HostRequest::FitToWindow(rect));
    Ok("Fit to window".to_string())
}

fn print_pdf<V: Viewport>(k: &mut Kataja<V>, _: &Invocation<'_>) -> Result<String> {
    k.request(HostRequest::PrintPdf);
    Ok("Printing".to_string())
}

fn add_node<V: Viewport>(k: &mut Kataja<V>, inv: &Invocation<'_>) -> Result<String> {
    let node_type = inv.node_type()?;
    let position = inv
        .args
        .position
        .unwrap_or_else(|| k.viewport().visible_rect().center());
    let label = inv.args.text.as_deref().unwrap_or(node_type.name()).to_string();
    let forest = k.forest_mut();
    let id = forest.create_node(node_type, &label);
    if let Some(node) = forest.state_mut().node_mut(id) {
        node.computed_position = position;
        node.current_position = position;
    }
    forest.select(id)?;
    Ok(format!("Added {} {label}", node_type.name()))
}

fn edit_color<V: Viewport>(k: &mut Kataja<V>, inv: &Invocation<'_>) -> Result<String> {
    let node_type = inv.node_type()?;
    let color = inv.args.color.ok_or_else(|| inv.missing("color"))?;
    k.style_mut(node_type).color = color;
    k.emit(Signal::PaletteChanged, node_type.name());
    Ok(format!("{} color: {color}", node_type.name()))
}

fn select_font<V: Viewport>(k: &mut Kataja<V>, inv: &Invocation<'_>) -> Result<String> {
    let node_type = inv.node_type()?;
    let font = inv.text("font")?.to_string();
    k.style_mut(node_type).font.clone_from(&font);
    k.emit(Signal::UiFontChanged, node_type.name());
    Ok(format!("{} font: {font}", node_type.name()))
}
