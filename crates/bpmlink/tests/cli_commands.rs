#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output};
use std::thread;

/// How the fake board answers each request.
#[derive(Clone, Copy)]
enum Device {
    /// Echo the payload back; an empty request gets `[command, command]`.
    Echo,
    /// Send a header announcing 8 payload bytes, then two, then hang up.
    Truncating,
}

/// Start a fake board on a loopback port and return `host:port`.
fn spawn_device(device: Device) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("loopback bind should work");
    let addr = listener.local_addr().expect("listener has an address");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            thread::spawn(move || serve(stream, device));
        }
    });
    addr.to_string()
}

fn serve(mut stream: TcpStream, device: Device) {
    loop {
        let mut header = [0u8; 3];
        if stream.read_exact(&mut header).is_err() {
            return;
        }
        let len = u16::from_be_bytes([header[1], header[2]]) as usize;
        let mut payload = vec![0u8; len];
        if stream.read_exact(&mut payload).is_err() {
            return;
        }

        match device {
            Device::Echo => {
                let reply = if payload.is_empty() {
                    vec![header[0], header[0]]
                } else {
                    payload
                };
                let mut packet = vec![header[0]];
                packet.extend_from_slice(&(reply.len() as u16).to_be_bytes());
                packet.extend_from_slice(&reply);
                if stream.write_all(&packet).is_err() {
                    return;
                }
            }
            Device::Truncating => {
                let _ = stream.write_all(&[header[0], 0x00, 0x08, 0xAA, 0xBB]);
                return;
            }
        }
    }
}

fn bpmlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bpmlink"))
        .env_remove("BPMLINK_TARGET")
        .env_remove("BPMLINK_BAUD")
        .env_remove("BPMLINK_LOG_LEVEL")
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("bpmlink should run")
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be one JSON document")
}

#[test]
fn send_prints_the_response_packet() {
    let target = spawn_device(Device::Echo);

    let output = bpmlink(&["send", "-t", &target, "-c", "0x10", "--data", "0a0b"]);

    assert!(output.status.success(), "{output:?}");
    let packet = json(&output);
    assert_eq!(packet["command"], 16);
    assert_eq!(packet["payload_size"], 2);
    assert_eq!(packet["payload"], "0a0b");
}

#[test]
fn call_reports_every_operation_in_table_order() {
    let target = spawn_device(Device::Echo);

    let output = bpmlink(&[
        "call",
        "--target",
        &target,
        "--curve",
        "3:3:2",
        "--func",
        "0x10:0102",
        "--get-var",
        "2:4",
        "--set-var",
        "4:1f",
    ]);

    assert!(output.status.success(), "{output:?}");
    let results = json(&output);
    let results = results.as_array().expect("results array");
    let names: Vec<&str> = results
        .iter()
        .map(|r| r["name"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(
        names,
        vec!["set-var 0x04", "get-var 0x02", "func 0x10", "curve 0x03"]
    );
    assert_eq!(results[1]["output"], "0202");
    assert_eq!(results[2]["output"], "0102");
    assert_eq!(results[3]["output"], "000000010002");
    assert_eq!(results[3]["operation"]["kind"], "curve");
}

#[test]
fn monitor_stops_after_count_samples() {
    let target = spawn_device(Device::Echo);

    let output = bpmlink(&[
        "monitor",
        "-t",
        &target,
        "--var",
        "0x30:2",
        "--interval",
        "10ms",
        "--count",
        "3",
    ]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let samples: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("one JSON object per line"))
        .collect();
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[2]["seq"], 2);
    assert_eq!(samples[0]["data"], "3030");
}

#[test]
fn refused_connection_exits_with_transport_error() {
    let target = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("loopback bind should work");
        listener.local_addr().expect("listener has an address").to_string()
    };

    let output = bpmlink(&["call", "-t", &target, "--get-var", "1"]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: connect to tcp://"), "{stderr}");
}

#[test]
fn short_response_exits_with_framing_error() {
    let target = spawn_device(Device::Truncating);

    let output = bpmlink(&["call", "-t", &target, "--get-var", "1"]);

    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("get-var 0x01"), "{stderr}");
}

#[test]
fn call_without_operations_is_a_usage_error() {
    let output = bpmlink(&["call", "-t", "127.0.0.1:9"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_reports_package_version() {
    let output = bpmlink(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("bpmlink {}", env!("CARGO_PKG_VERSION")));
}
