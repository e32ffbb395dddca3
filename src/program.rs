//! Filter programs: one scalar arithmetic expression as an ordered step list.
//!
//! A [`Program`] is built once, terminated by a [`Step::Done`] sentinel, and
//! never mutated afterwards; a single program is shared read-only across every
//! pixel and channel of a traversal, and may be reused across many images.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ChanfxError, ChanfxResult},
    pixel::RefColor,
};

/// Upper bound on steps in one program.
pub const MAX_PROGRAM_STEPS: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Push the source pixel's current channel, normalized to `[0, 1]`.
    LoadSourceColor,
    /// Push the reference color's value for the channel being evaluated.
    LoadConstantColor(RefColor),
    /// Push a literal.
    LoadNumber(f64),
    /// Pop b, pop a, push a + b.
    Add,
    /// Pop b, pop a, push a * b.
    Multiply,
    /// Clamp the top of stack into `[0, 1]`.
    Clamp,
    /// Terminate; the result is the top of stack.
    Done,
}

/// Serializes as its step list; deserialization re-runs the
/// [`Program::from_steps`] checks, so a program loaded from data is as
/// well-formed as a built one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct Program {
    steps: Vec<Step>,
}

impl TryFrom<Vec<Step>> for Program {
    type Error = ChanfxError;

    fn try_from(steps: Vec<Step>) -> ChanfxResult<Program> {
        Program::from_steps(steps)
    }
}

impl From<Program> for Vec<Step> {
    fn from(program: Program) -> Vec<Step> {
        program.steps
    }
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder { steps: Vec::new() }
    }

    /// Build a program from raw steps, e.g. deserialized ones. The list must
    /// end with exactly one `Done` and fit the fixed step capacity.
    pub fn from_steps(steps: Vec<Step>) -> ChanfxResult<Program> {
        if steps.len() > MAX_PROGRAM_STEPS {
            return Err(ChanfxError::validation(format!(
                "program has {} steps, capacity is {MAX_PROGRAM_STEPS}",
                steps.len()
            )));
        }
        match steps.last() {
            Some(Step::Done) => {}
            _ => {
                return Err(ChanfxError::validation(
                    "program must terminate with a Done step",
                ));
            }
        }
        if steps[..steps.len() - 1].contains(&Step::Done) {
            return Err(ChanfxError::validation(
                "Done must be the final step of a program",
            ));
        }
        Ok(Program { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Appends steps in evaluation order; `finish` adds the `Done` sentinel.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    steps: Vec<Step>,
}

impl ProgramBuilder {
    pub fn load_source(mut self) -> Self {
        self.steps.push(Step::LoadSourceColor);
        self
    }

    pub fn load_color(mut self, color: RefColor) -> Self {
        self.steps.push(Step::LoadConstantColor(color));
        self
    }

    pub fn load_number(mut self, value: f64) -> Self {
        self.steps.push(Step::LoadNumber(value));
        self
    }

    pub fn add(mut self) -> Self {
        self.steps.push(Step::Add);
        self
    }

    pub fn multiply(mut self) -> Self {
        self.steps.push(Step::Multiply);
        self
    }

    pub fn clamp(mut self) -> Self {
        self.steps.push(Step::Clamp);
        self
    }

    pub fn finish(mut self) -> ChanfxResult<Program> {
        self.steps.push(Step::Done);
        Program::from_steps(self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_done_sentinel() {
        let p = Program::builder()
            .load_source()
            .load_number(0.5)
            .multiply()
            .finish()
            .unwrap();
        assert_eq!(p.steps().last(), Some(&Step::Done));
        assert_eq!(p.steps().len(), 4);
    }

    #[test]
    fn from_steps_rejects_missing_done() {
        let err = Program::from_steps(vec![Step::LoadSourceColor]).unwrap_err();
        assert!(err.to_string().contains("Done"));
    }

    #[test]
    fn from_steps_rejects_interior_done() {
        let err =
            Program::from_steps(vec![Step::Done, Step::LoadSourceColor, Step::Done]).unwrap_err();
        assert!(err.to_string().contains("final step"));
    }

    #[test]
    fn from_steps_rejects_oversized_program() {
        let mut steps = vec![Step::LoadNumber(0.0); MAX_PROGRAM_STEPS];
        steps.push(Step::Done);
        let err = Program::from_steps(steps).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn program_round_trips_through_json() {
        let p = Program::builder()
            .load_source()
            .load_color(RefColor::new(1.0, 0.0, 0.25))
            .add()
            .clamp()
            .finish()
            .unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn deserialization_rejects_a_program_without_done() {
        let err = serde_json::from_str::<Program>(r#"["LoadSourceColor"]"#).unwrap_err();
        assert!(err.to_string().contains("Done"));
    }
}
