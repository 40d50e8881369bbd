//! Shared test harness: a node wired to in-memory streams, driven line by
//! line the way the real transport would.

#![allow(dead_code)]

use murmur::{Body, Envelope, Node};
use serde_json::{json, Value};
use tokio::{
    io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream},
    task::JoinHandle,
};

pub struct Harness {
    pub node: Node,
    input: DuplexStream,
    output: BufReader<DuplexStream>,
}

impl Harness {
    pub fn new() -> Self {
        let (input, node_input) = duplex(64 * 1024);
        let (node_output, output) = duplex(64 * 1024);
        let node = Node::with_io(node_input, node_output);
        Harness {
            node,
            input,
            output: BufReader::new(output),
        }
    }

    /// Runs the node on its own task.
    pub fn spawn(&self) -> JoinHandle<Result<(), murmur::Error>> {
        let node = self.node.clone();
        tokio::spawn(async move { node.run().await })
    }

    /// Writes one raw line to the node's input.
    pub async fn send_line(&mut self, line: &str) {
        self.input.write_all(line.as_bytes()).await.unwrap();
        self.input.write_all(b"\n").await.unwrap();
    }

    /// Writes one envelope to the node's input.
    pub async fn send(&mut self, src: &str, dest: &str, body: Value) {
        self.send_line(&json!({ "src": src, "dest": dest, "body": body }).to_string())
            .await;
    }

    /// Reads and decodes the node's next output line.
    pub async fn recv(&mut self) -> Envelope {
        let mut line = String::new();
        let n = self.output.read_line(&mut line).await.unwrap();
        assert!(n > 0, "node output closed");
        serde_json::from_str(&line).unwrap()
    }

    /// Completes the init handshake and asserts the ack.
    pub async fn init(&mut self, node_id: &str, node_ids: &[&str]) {
        self.send(
            "c0",
            node_id,
            json!({
                "type": "init",
                "msg_id": 0,
                "node_id": node_id,
                "node_ids": node_ids,
            }),
        )
        .await;
        let reply = self.recv().await;
        let body: Body = reply.decode().unwrap();
        assert_eq!(body.kind, "init_ok");
        assert_eq!(body.in_reply_to, Some(0));
    }

    /// Signals end-of-input by closing the write side.
    pub async fn close_input(&mut self) {
        self.input.shutdown().await.unwrap();
    }
}
