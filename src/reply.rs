use crate::gate::GateState;
use serde::Deserialize;
use std::fmt;

/// Which wording to use for invalid commands.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// "Comando inválido."
    #[default]
    Short,
    /// "Comando inválido. Use ABRIR ou FECHAR."
    Verbose,
}

/// A status line sent back over the serial port.
#[derive(Eq, PartialEq, Clone, Debug)]
pub enum Reply {
    /// Sent once after initialization.
    Started,
    /// Echo of every received line.
    Received(String),
    Status(GateState),
    Invalid(Dialect),
    LineTooLong,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Started => f.write_str("Sistema de cancela iniciado."),
            Reply::Received(line) => write!(f, "Comando recebido: {}", line),
            Reply::Status(state) => write!(f, "Cancela: {}", state.label()),
            Reply::Invalid(Dialect::Short) => f.write_str("Comando inválido."),
            Reply::Invalid(Dialect::Verbose) => {
                f.write_str("Comando inválido. Use ABRIR ou FECHAR.")
            }
            Reply::LineTooLong => f.write_str("Linha muito longa."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_text() {
        assert_eq!(Reply::Status(GateState::Open).to_string(), "Cancela: ABERTA");
        assert_eq!(
            Reply::Status(GateState::Closing).to_string(),
            "Cancela: FECHANDO"
        );
        assert_eq!(Reply::Invalid(Dialect::Short).to_string(), "Comando inválido.");
        assert_eq!(
            Reply::Invalid(Dialect::Verbose).to_string(),
            "Comando inválido. Use ABRIR ou FECHAR."
        );
        assert_eq!(
            Reply::Received("xyz".into()).to_string(),
            "Comando recebido: xyz"
        );
    }
}
