//! The two-pass half of the reference assembler. Pass one walks the unit
//! stream computing the effective address each unit will occupy and pins
//! label definitions. Pass two re-emits the source in resolved form:
//! comments and labels are gone, every operand is numeric, and branch
//! operands are already-computed signed displacements. The resolved text is
//! what both the reference emitter and the self-hosting assembler consume.

use crate::lexer::{self, LabelTable, Operand, SourceError, SourceUnit, Unit};
use crate::opcodes::{OpEntry, Shape, END_OPCODE};

/// Resolve friendly source into the punch form.
pub fn resolve(source: &str) -> Result<String, SourceError> {
    let (units, mut labels) = lexer::tokenize(source)?;
    assign_addresses(source, &units, &mut labels)?;
    emit(source, &units, &labels)
}

/// Pass one. Only the effective address matters here; nothing is emitted.
/// The relocation base moves the output pointer, not the effective address,
/// so `!` is a no-op for label assignment.
fn assign_addresses(
    source: &str,
    units: &[SourceUnit],
    labels: &mut LabelTable,
) -> Result<(), SourceError> {
    let mut effective: u16 = 0;
    for source_unit in units {
        match &source_unit.unit {
            Unit::SetBase(_) => {}
            Unit::SetOrigin(value) => effective = *value,
            Unit::Byte(_) => effective = effective.wrapping_add(1),
            Unit::Text(text) => effective = effective.wrapping_add(text.len() as u16),
            Unit::LabelDef(index) => {
                labels
                    .define(*index, effective)
                    .map_err(|message| SourceError::new(message, source, source_unit.row, 0))?;
            }
            Unit::Op { entry, .. } => {
                if entry.opcode == END_OPCODE {
                    break;
                }
                effective = effective.wrapping_add(entry.shape.encoded_len());
            }
        }
    }
    Ok(())
}

/// Pass two. Directives and literals pass through unchanged; mnemonics have
/// their operands rewritten to numbers.
fn emit(
    source: &str,
    units: &[SourceUnit],
    labels: &LabelTable,
) -> Result<String, SourceError> {
    let mut out = String::new();
    let mut effective: u16 = 0;

    for source_unit in units {
        match &source_unit.unit {
            Unit::SetBase(value) => out.push_str(&format!("!{:04X}\n", value)),
            Unit::SetOrigin(value) => {
                effective = *value;
                out.push_str(&format!("@{:04X}\n", value));
            }
            Unit::Byte(value) => {
                effective = effective.wrapping_add(1);
                out.push_str(&format!("#{:02X}\n", value));
            }
            Unit::Text(text) => {
                effective = effective.wrapping_add(text.len() as u16);
                out.push_str(&format!("\"{}\"\n", text));
            }
            Unit::LabelDef(_) => {}
            Unit::Op { entry, operand } => {
                if entry.opcode == END_OPCODE {
                    out.push_str(&format!("{}\n", entry.name()));
                    break;
                }
                let line = emit_op(source, source_unit, entry, operand, effective, labels)?;
                out.push_str(&line);
                effective = effective.wrapping_add(entry.shape.encoded_len());
            }
        }
    }
    Ok(out)
}

fn emit_op(
    source: &str,
    source_unit: &SourceUnit,
    entry: &OpEntry,
    operand: &Option<Operand>,
    effective: u16,
    labels: &LabelTable,
) -> Result<String, SourceError> {
    let fail = |message: String| SourceError::new(message, source, source_unit.row, 0);
    let label_address = |index: usize| {
        labels
            .address_of(index)
            .ok_or_else(|| fail(format!("Unknown label \"{}\"", labels.name(index))))
    };

    Ok(match entry.shape {
        Shape::Implied => format!("{}\n", entry.name()),
        Shape::Byte => match operand {
            Some(Operand::Value(value)) => format!("{} {:02X}\n", entry.name(), value),
            // The lexer rejects label operands on one-byte shapes.
            _ => return Err(fail("Missing one-byte operand".to_string())),
        },
        Shape::Word => {
            let value = match operand {
                Some(Operand::Value(value)) => *value,
                Some(Operand::Label(index)) => label_address(*index)?,
                None => return Err(fail("Missing two-byte operand".to_string())),
            };
            format!("{} {:04X}\n", entry.name(), value)
        }
        Shape::Branch => {
            let displacement = match operand {
                // A numeric operand is already a displacement.
                Some(Operand::Value(value)) => *value as u8,
                Some(Operand::Label(index)) => {
                    let target = label_address(*index)?;
                    let displacement = target as i32 - (effective as i32 + 2);
                    if !(-128..=127).contains(&displacement) {
                        return Err(fail(format!(
                            "Branch out of range: {} is {} bytes away",
                            labels.name(*index),
                            displacement
                        )));
                    }
                    displacement as i8 as u8
                }
                None => return Err(fail("Missing branch operand".to_string())),
            };
            format!("{} {:02X}\n", entry.name(), displacement)
        }
    })
}
