use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    config::InstanceId,
    core::{fee::BracketFeeTable, state::EngineState},
    quantity::cost::Cost,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

/// Persisted accumulator state per instance, [`None`] when nothing has been saved yet.
pub fn build_states_table(states: &[(InstanceId, Option<EngineState>)], currency: &str) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Instance", "Counter", "Day", "Energy", "Month", "Energy"]);
    for (id, state) in states {
        let Some(state) = state else {
            table.add_row(vec![
                Cell::new(id).add_attribute(Attribute::Bold),
                Cell::new("not saved yet").add_attribute(Attribute::Dim),
            ]);
            continue;
        };
        table.add_row(vec![
            Cell::new(id).add_attribute(Attribute::Bold),
            Cell::new(state.previous_counter.map_or_else(|| "-".to_owned(), |counter| counter.to_string()))
                .set_alignment(CellAlignment::Right),
            Cell::new(state.current_day_key.as_deref().unwrap_or("-")).add_attribute(Attribute::Dim),
            cost_cell(state.day_energy_cost, currency),
            Cell::new(state.current_month_key.as_deref().unwrap_or("-")).add_attribute(Attribute::Dim),
            cost_cell(state.month_energy_cost, currency),
        ]);
    }
    table
}

/// Monthly capacity fees and their daily shares in a month of the given length.
pub fn build_fees_table(fees: &BracketFeeTable, currency: &str, days_in_month: u32) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Bracket", "Monthly fee", "Daily share"]);
    for (bracket, fee) in fees {
        table.add_row(vec![
            Cell::new(bracket).set_alignment(CellAlignment::Right),
            cost_cell(*fee, currency),
            cost_cell(*fee / days_in_month, currency).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

fn cost_cell(cost: Cost, currency: &str) -> Cell {
    Cell::new(format!("{cost} {currency}"))
        .set_alignment(CellAlignment::Right)
        .fg(if cost > Cost::ZERO { Color::DarkYellow } else { Color::Green })
}
