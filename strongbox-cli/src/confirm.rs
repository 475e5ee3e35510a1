//! Interactive driver for [`ConfirmationGate`]

use std::io::{self, BufRead, Write};

use strongbox_core::{AnswerOutcome, Challenge, ConfirmationGate, GateError, RestorePermit};

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("restore not confirmed: {0}")]
    Gate(#[from] GateError),

    #[error("restore not confirmed: input closed")]
    Aborted,

    #[error("failed to read confirmation: {0}")]
    Io(#[from] io::Error),
}

/// Source of answers for a pending challenge.
pub trait Responder {
    /// `Ok(None)` means no more input is coming.
    fn respond(&mut self, challenge: &Challenge, attempts_left: u8) -> io::Result<Option<String>>;
}

/// Prompts on `output`, reads one line per answer from `input`.
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }
}

impl<R: BufRead, W: Write> Responder for Terminal<R, W> {
    fn respond(&mut self, challenge: &Challenge, attempts_left: u8) -> io::Result<Option<String>> {
        write!(
            self.output,
            "{} ({} attempt{} left) ",
            challenge,
            attempts_left,
            if attempts_left == 1 { "" } else { "s" }
        )?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Run the gate to completion and hand back a permit.
pub fn confirm(
    gate: &mut ConfirmationGate,
    responder: &mut impl Responder,
) -> Result<RestorePermit, ConfirmError> {
    let mut challenge = gate.start()?;
    let mut attempts_left = strongbox_core::MAX_ATTEMPTS;

    loop {
        let Some(reply) = responder.respond(&challenge, attempts_left)? else {
            gate.reset();
            return Err(ConfirmError::Aborted);
        };

        match gate.answer_text(&reply)? {
            AnswerOutcome::Verified => return Ok(gate.take_permit()?),
            AnswerOutcome::Retry {
                challenge: next,
                attempts_left: left,
            } => {
                challenge = next;
                attempts_left = left;
            }
            AnswerOutcome::Failed => {
                gate.reset();
                return Err(ConfirmError::Gate(GateError::Exhausted));
            }
        }
    }
}
