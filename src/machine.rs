//! The evaluation machine: a bounded-stack interpreter run once per
//! (pixel, channel) pair.
//!
//! Evaluation is a pure function of the program, one normalized scalar input,
//! and the identity of the channel being computed. The stack lives on the
//! call frame, so concurrent evaluations never share scratch state, and every
//! over/underflow is detected before any slot outside the live region is
//! touched.

use crate::{
    error::{ChanfxError, ChanfxResult},
    pixel::{Channel, clamp01},
    program::{Program, Step},
};

/// Fixed capacity of the evaluation stack.
pub const MAX_STACK: usize = 256;

struct EvalStack {
    slots: [f64; MAX_STACK],
    len: usize,
}

impl EvalStack {
    fn new() -> Self {
        EvalStack {
            slots: [0.0; MAX_STACK],
            len: 0,
        }
    }

    fn push(&mut self, value: f64, step: usize) -> ChanfxResult<()> {
        if self.len == MAX_STACK {
            return Err(ChanfxError::malformed(format!(
                "stack overflow at step {step} (capacity {MAX_STACK})"
            )));
        }
        self.slots[self.len] = value;
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self, step: usize) -> ChanfxResult<f64> {
        if self.len == 0 {
            return Err(ChanfxError::malformed(format!(
                "stack underflow at step {step}"
            )));
        }
        self.len -= 1;
        Ok(self.slots[self.len])
    }

    fn top_mut(&mut self, step: usize) -> ChanfxResult<&mut f64> {
        if self.len == 0 {
            return Err(ChanfxError::malformed(format!(
                "stack underflow at step {step}"
            )));
        }
        Ok(&mut self.slots[self.len - 1])
    }
}

/// Run `program` for one channel of one pixel.
///
/// `source_value` is the source pixel's channel, already normalized to
/// `[0, 1]`. A `LoadConstantColor` step resolves its reference color to the
/// channel currently being evaluated; for `Alpha`, which has no slot in an
/// rgb reference color, it pushes the defined fallback 0.0.
pub fn evaluate(program: &Program, source_value: f64, channel: Channel) -> ChanfxResult<f64> {
    let mut stack = EvalStack::new();

    for (i, step) in program.steps().iter().enumerate() {
        match *step {
            Step::LoadSourceColor => stack.push(source_value, i)?,
            Step::LoadConstantColor(color) => {
                let value = match channel.rgb_index() {
                    Some(idx) => color.rgb()[idx],
                    None => 0.0,
                };
                stack.push(value, i)?;
            }
            Step::LoadNumber(value) => stack.push(value, i)?,
            Step::Add => {
                let b = stack.pop(i)?;
                let a = stack.pop(i)?;
                stack.push(a + b, i)?;
            }
            Step::Multiply => {
                let b = stack.pop(i)?;
                let a = stack.pop(i)?;
                stack.push(a * b, i)?;
            }
            Step::Clamp => {
                let top = stack.top_mut(i)?;
                *top = clamp01(*top);
            }
            Step::Done => {
                if stack.len == 0 {
                    return Err(ChanfxError::malformed(format!(
                        "Done on an empty stack at step {i}"
                    )));
                }
                return Ok(stack.slots[stack.len - 1]);
            }
        }
    }

    Err(ChanfxError::malformed(
        "program ended without a Done step",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pixel::RefColor, program::Step};

    fn run(program: &Program, source: f64) -> f64 {
        evaluate(program, source, Channel::Red).unwrap()
    }

    #[test]
    fn clamp_law() {
        let over = Program::builder().load_number(2.0).clamp().finish().unwrap();
        let under = Program::builder()
            .load_number(-5.0)
            .clamp()
            .finish()
            .unwrap();
        for source in [0.0, 0.3, 1.0] {
            assert_eq!(run(&over, source), 1.0);
            assert_eq!(run(&under, source), 0.0);
        }
    }

    #[test]
    fn multiply_halves_the_source() {
        let p = Program::builder()
            .load_source()
            .load_number(0.5)
            .multiply()
            .finish()
            .unwrap();
        assert!((run(&p, 0.8) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn identity_program_returns_source() {
        let p = Program::builder().load_source().finish().unwrap();
        for source in [0.0, 0.25, 1.0] {
            assert_eq!(run(&p, source), source);
        }
    }

    #[test]
    fn constant_color_resolves_per_channel() {
        let p = Program::builder()
            .load_color(RefColor::new(0.1, 0.2, 0.3))
            .finish()
            .unwrap();
        assert_eq!(evaluate(&p, 0.5, Channel::Red).unwrap(), 0.1);
        assert_eq!(evaluate(&p, 0.5, Channel::Green).unwrap(), 0.2);
        assert_eq!(evaluate(&p, 0.5, Channel::Blue).unwrap(), 0.3);
    }

    #[test]
    fn constant_color_for_alpha_pushes_zero() {
        let p = Program::builder()
            .load_color(RefColor::new(0.1, 0.2, 0.3))
            .finish()
            .unwrap();
        assert_eq!(evaluate(&p, 0.5, Channel::Alpha).unwrap(), 0.0);
    }

    #[test]
    fn add_as_first_step_is_underflow() {
        let p = Program::from_steps(vec![Step::Add, Step::Done]).unwrap();
        let err = evaluate(&p, 0.5, Channel::Red).unwrap_err();
        assert!(matches!(err, ChanfxError::MalformedProgram(_)));
        assert!(err.to_string().contains("underflow"));
    }

    #[test]
    fn single_operand_add_is_underflow() {
        let p = Program::builder().load_source().add().finish().unwrap();
        let err = evaluate(&p, 0.5, Channel::Red).unwrap_err();
        assert!(matches!(err, ChanfxError::MalformedProgram(_)));
    }

    #[test]
    fn done_on_empty_stack_is_malformed() {
        let p = Program::from_steps(vec![Step::Done]).unwrap();
        let err = evaluate(&p, 0.5, Channel::Red).unwrap_err();
        assert!(err.to_string().contains("empty stack"));
    }

    #[test]
    fn overflow_past_capacity_is_detected() {
        let mut steps = vec![Step::LoadNumber(0.0); MAX_STACK + 1];
        steps.push(Step::Done);
        let p = Program::from_steps(steps).unwrap();
        let err = evaluate(&p, 0.5, Channel::Red).unwrap_err();
        assert!(matches!(err, ChanfxError::MalformedProgram(_)));
        assert!(err.to_string().contains("overflow"));
    }
}
