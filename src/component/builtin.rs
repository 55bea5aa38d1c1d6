//! Built-in component templates.
//!
//! Gates read an unset input as low. Every gate has a delay of one tick;
//! the interconnect has none, so a net adds only its wire delays.

use super::level::Level;
use super::props::ComponentTemplate;

/// Kind name of the fan-out component.
pub const INTERCONNECT: &str = "interconnect";

fn gate<F>(kind: &str, reduce: F) -> ComponentTemplate
where
    F: Fn(&[Level]) -> bool + 'static,
{
    ComponentTemplate::new(kind, move |ins: &[Level], _outputs: usize| {
        vec![Level::from(reduce(ins))]
    })
    .with_input_range(2, 2, 8)
    .with_outputs(1)
    .with_delay(1)
}

fn highs(ins: &[Level]) -> usize {
    ins.iter().filter(|l| l.is_high()).count()
}

pub fn and() -> ComponentTemplate {
    gate("AND", |ins| highs(ins) == ins.len())
}

pub fn or() -> ComponentTemplate {
    gate("OR", |ins| highs(ins) > 0)
}

/// Odd parity over all inputs.
pub fn xor() -> ComponentTemplate {
    gate("XOR", |ins| highs(ins) % 2 == 1)
}

pub fn nand() -> ComponentTemplate {
    gate("NAND", |ins| highs(ins) != ins.len())
}

pub fn nor() -> ComponentTemplate {
    gate("NOR", |ins| highs(ins) == 0)
}

pub fn not() -> ComponentTemplate {
    ComponentTemplate::new("NOT", |ins: &[Level], _outputs: usize| {
        vec![Level::from(!ins.first().is_some_and(|l| l.is_high()))]
    })
    .with_inputs(1)
    .with_outputs(1)
    .with_delay(1)
}

pub fn buffer() -> ComponentTemplate {
    ComponentTemplate::new("BUFFER", |ins: &[Level], _outputs: usize| {
        vec![Level::from(ins.first().is_some_and(|l| l.is_high()))]
    })
    .with_inputs(1)
    .with_outputs(1)
    .with_delay(1)
}

/// A net with one driver and several destinations.
///
/// Copies its input level, unset included, to every output.
pub fn interconnect() -> ComponentTemplate {
    ComponentTemplate::new(INTERCONNECT, |ins: &[Level], outputs: usize| {
        vec![ins.first().copied().unwrap_or_default(); outputs]
    })
    .with_inputs(1)
    .with_output_range(2, 1, 16)
    .with_delay(0)
}

/// Every built-in template.
pub fn all() -> Vec<ComponentTemplate> {
    vec![and(), or(), xor(), nand(), nor(), not(), buffer(), interconnect()]
}
