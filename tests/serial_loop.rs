use servo_gate::comm::Comm;
use servo_gate::config::{Config, GateConfig};
use servo_gate::controller::{self, Controller};
use servo_gate::gate::GateState;
use servo_gate::servo::SimulatedServo;
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

async fn next_line(stream: &mut BufReader<DuplexStream>) -> String {
    let mut line = String::new();
    stream.read_line(&mut line).await.unwrap();
    line
}

#[tokio::test]
async fn answers_commands_over_the_wire() {
    let (local, remote) = duplex(1024);
    let mut comm = Comm::from_stream(local);
    let mut ctrl = Controller::new(SimulatedServo::new(), &Config::default()).unwrap();

    let script = async move {
        let mut remote = BufReader::new(remote);
        let mut seen = Vec::new();
        for _ in 0..2 {
            seen.push(next_line(&mut remote).await);
        }

        remote.write_all(b"ABRIR\r\n").await.unwrap();
        for _ in 0..2 {
            seen.push(next_line(&mut remote).await);
        }

        remote.write_all(b"xyz\nFECHAR\n").await.unwrap();
        for _ in 0..4 {
            seen.push(next_line(&mut remote).await);
        }
        // Dropping the stream ends the loop.
        seen
    };

    let (seen, result) = tokio::join!(script, controller::run(&mut ctrl, &mut comm));
    result.unwrap();

    assert_eq!(
        seen,
        vec![
            "Sistema de cancela iniciado.\r\n",
            "Cancela: FECHADA\r\n",
            "Comando recebido: ABRIR\r\n",
            "Cancela: ABERTA\r\n",
            "Comando recebido: xyz\r\n",
            "Comando inválido.\r\n",
            "Comando recebido: FECHAR\r\n",
            "Cancela: FECHADA\r\n",
        ]
    );
    assert_eq!(ctrl.state(), GateState::Closed);
    assert_eq!(ctrl.gate().angle(), Some(0));
}

#[tokio::test]
async fn reports_finished_move_without_new_input() {
    let config = Config {
        gate: GateConfig {
            move_time_ms: 50,
            ..GateConfig::default()
        },
        ..Config::default()
    };
    let (local, remote) = duplex(1024);
    let mut comm = Comm::from_stream(local);
    let mut ctrl = Controller::new(SimulatedServo::new(), &config).unwrap();

    let script = async move {
        let mut remote = BufReader::new(remote);
        for _ in 0..2 {
            next_line(&mut remote).await;
        }

        remote.write_all(b"ABRIR\n").await.unwrap();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(next_line(&mut remote).await);
        }
        seen
    };

    let (seen, result) = tokio::join!(script, controller::run(&mut ctrl, &mut comm));
    result.unwrap();

    assert_eq!(
        seen,
        vec![
            "Comando recebido: ABRIR\r\n",
            "Cancela: ABRINDO\r\n",
            "Cancela: ABERTA\r\n",
        ]
    );
    assert_eq!(ctrl.state(), GateState::Open);
}
