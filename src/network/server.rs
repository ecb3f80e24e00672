use crate::core::{Block, Blockchain};
use crate::error::{BlockchainError, Result};
use crate::network::{ChainResponse, ChainSource};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Deserializer;
use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_NODE: &str = "127.0.0.1:2001";
const TCP_READ_TIMEOUT: u64 = 60;
/// Largest reply a client will buffer from one connection.
pub const MAX_REPLY_BYTES: u64 = 32 * 1024 * 1024;

/// Messages exchanged between nodes and clients. Every connection carries one
/// request and one reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Package {
    GetChain,
    Chain {
        chain: Vec<Block>,
        length: usize,
    },
    NewTransaction {
        sender: Option<String>,
        recipient: Option<String>,
        amount: Option<u64>,
    },
    TransactionAccepted {
        index: u64,
    },
    Mine,
    Mined {
        block: Block,
    },
    RegisterNodes {
        nodes: Option<Vec<String>>,
    },
    NodesRegistered {
        total_nodes: Vec<String>,
    },
    Resolve,
    Resolved {
        replaced: bool,
        chain: Vec<Block>,
    },
    Error {
        message: String,
    },
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| BlockchainError::Validation(format!("Missing value: {field}")))
}

pub struct Server {
    blockchain: Blockchain,
}

impl Server {
    pub fn new(blockchain: Blockchain) -> Self {
        Self { blockchain }
    }

    /// Bind `addr` and serve until the process exits.
    pub fn run(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        info!("Server listening on {addr}");
        self.serve(listener);
        Ok(())
    }

    /// Accept connections on an already bound listener, one thread each.
    pub fn serve(&self, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };

                    let blockchain = self.blockchain.clone();
                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(&blockchain, stream, peer_addr) {
                            error!("Error handling connection from {peer_addr}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }

    fn handle_connection(
        blockchain: &Blockchain,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<()> {
        stream
            .set_read_timeout(Some(Duration::from_secs(TCP_READ_TIMEOUT)))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;

        let reader = BufReader::new(&stream);
        let request = Deserializer::from_reader(reader)
            .into_iter::<Package>()
            .next()
            .ok_or_else(|| BlockchainError::Network("Connection closed before a request".to_string()))?;

        let reply = match request {
            Ok(pkg) => {
                info!("Received request from {peer_addr}: {}", Self::describe(&pkg));
                Self::process_message(blockchain, pkg).unwrap_or_else(|e| {
                    warn!("Request from {peer_addr} failed: {e}");
                    Package::Error {
                        message: e.to_string(),
                    }
                })
            }
            Err(e) => Package::Error {
                message: format!("Malformed request: {e}"),
            },
        };

        let mut writer = &stream;
        serde_json::to_writer(&mut writer, &reply)?;
        writer.flush()?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }

    // Chains can be large; log the kind of request, not its payload
    fn describe(pkg: &Package) -> &'static str {
        match pkg {
            Package::GetChain => "get_chain",
            Package::NewTransaction { .. } => "new_transaction",
            Package::Mine => "mine",
            Package::RegisterNodes { .. } => "register_nodes",
            Package::Resolve => "resolve",
            _ => "reply",
        }
    }

    /// Turn one request into its reply.
    pub fn process_message(blockchain: &Blockchain, pkg: Package) -> Result<Package> {
        match pkg {
            Package::GetChain => {
                let (chain, length) = blockchain.get_chain()?;
                Ok(Package::Chain { chain, length })
            }
            Package::NewTransaction {
                sender,
                recipient,
                amount,
            } => {
                let sender = required(sender, "sender")?;
                let recipient = required(recipient, "recipient")?;
                let amount = required(amount, "amount")?;
                let index = blockchain.submit_transaction(&sender, &recipient, amount)?;
                Ok(Package::TransactionAccepted { index })
            }
            Package::Mine => Ok(Package::Mined {
                block: blockchain.mine()?,
            }),
            Package::RegisterNodes { nodes } => {
                let nodes = required(nodes, "nodes")?;
                if nodes.is_empty() {
                    return Err(BlockchainError::Validation(
                        "Please supply a valid list of nodes".to_string(),
                    ));
                }
                for node in &nodes {
                    blockchain.register_peer(node)?;
                }
                Ok(Package::NodesRegistered {
                    total_nodes: blockchain.get_peers(),
                })
            }
            Package::Resolve => {
                let (replaced, chain) = blockchain.resolve()?;
                Ok(Package::Resolved { replaced, chain })
            }
            other => Err(BlockchainError::Validation(format!(
                "Unexpected message: {}",
                Self::describe(&other)
            ))),
        }
    }
}

/// Reads from a stream until a fixed deadline, however the bytes trickle in.
struct DeadlineReader<'a> {
    stream: &'a TcpStream,
    deadline: Instant,
}

impl Read for DeadlineReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "reply not complete before the deadline",
            ));
        }
        self.stream.set_read_timeout(Some(remaining))?;
        (&*self.stream).read(buf)
    }
}

/// Send one request to `addr` and wait for its reply. `timeout` bounds the
/// whole exchange, and replies beyond `MAX_REPLY_BYTES` are rejected.
pub fn send_request(addr: &str, pkg: &Package, timeout: Duration) -> Result<Package> {
    let peer_unreachable = |reason: String| BlockchainError::PeerUnreachable {
        peer: addr.to_string(),
        reason,
    };

    let socket_addr = addr
        .to_socket_addrs()
        .map_err(|e| peer_unreachable(format!("cannot resolve address: {e}")))?
        .next()
        .ok_or_else(|| peer_unreachable("address resolved to nothing".to_string()))?;

    let deadline = Instant::now() + timeout;
    let stream = TcpStream::connect_timeout(&socket_addr, timeout)
        .map_err(|e| peer_unreachable(format!("failed to connect: {e}")))?;
    let remaining = deadline.saturating_duration_since(Instant::now());
    stream
        .set_write_timeout(Some(remaining.max(Duration::from_millis(1))))
        .map_err(|e| BlockchainError::Network(format!("Failed to set timeouts: {e}")))?;

    let mut writer = &stream;
    serde_json::to_writer(&mut writer, pkg)
        .map_err(|e| peer_unreachable(format!("failed to send request: {e}")))?;
    writer
        .flush()
        .and_then(|_| stream.shutdown(Shutdown::Write))
        .map_err(|e| peer_unreachable(format!("failed to send request: {e}")))?;

    let reader = DeadlineReader {
        stream: &stream,
        deadline,
    };
    serde_json::from_reader(BufReader::new(reader.take(MAX_REPLY_BYTES))).map_err(|e| {
        if e.is_io() {
            peer_unreachable(format!("no reply: {e}"))
        } else {
            BlockchainError::PeerProtocol {
                peer: addr.to_string(),
                reason: format!("malformed reply: {e}"),
            }
        }
    })
}

/// Fetches peer chains over the node protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpChainSource;

impl ChainSource for TcpChainSource {
    fn fetch_chain(&self, peer: &str, timeout: Duration) -> Result<ChainResponse> {
        match send_request(peer, &Package::GetChain, timeout)? {
            Package::Chain { chain, length } => Ok(ChainResponse { chain, length }),
            other => Err(BlockchainError::PeerProtocol {
                peer: peer.to_string(),
                reason: format!("expected a chain, got {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeOptions;
    use crate::testnet::MemoryChainSource;
    use std::sync::Arc;

    fn spawn_node() -> (Blockchain, String) {
        let blockchain = Blockchain::new(
            NodeOptions::new("server-node"),
            Arc::new(MemoryChainSource::new()),
        );
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = Server::new(blockchain.clone());
        thread::spawn(move || server.serve(listener));
        (blockchain, addr)
    }

    #[test]
    fn test_package_serialization() {
        let pkg = Package::NewTransaction {
            sender: Some("alice".to_string()),
            recipient: Some("bob".to_string()),
            amount: Some(5),
        };

        let serialized = serde_json::to_string(&pkg).unwrap();
        assert!(serialized.starts_with(r#"{"type":"new_transaction""#));
        let deserialized: Package = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, pkg);
    }

    #[test]
    fn test_missing_transaction_field_is_rejected() {
        let blockchain = Blockchain::new(
            NodeOptions::new("server-node"),
            Arc::new(MemoryChainSource::new()),
        );
        let request: Package =
            serde_json::from_str(r#"{"type":"new_transaction","sender":"alice","amount":5}"#)
                .unwrap();

        let err = Server::process_message(&blockchain, request).unwrap_err();
        assert_eq!(
            err,
            BlockchainError::Validation("Missing value: recipient".to_string())
        );
    }

    #[test]
    fn test_register_nodes_requires_a_list() {
        let blockchain = Blockchain::new(
            NodeOptions::new("server-node"),
            Arc::new(MemoryChainSource::new()),
        );
        for nodes in [None, Some(vec![])] {
            let result = Server::process_message(&blockchain, Package::RegisterNodes { nodes });
            assert!(matches!(result, Err(BlockchainError::Validation(_))));
        }
    }

    #[test]
    fn test_chain_query_over_loopback() {
        let (blockchain, addr) = spawn_node();
        let timeout = Duration::from_secs(5);

        let reply = send_request(
            &addr,
            &Package::NewTransaction {
                sender: Some("alice".to_string()),
                recipient: Some("bob".to_string()),
                amount: Some(5),
            },
            timeout,
        )
        .unwrap();
        assert_eq!(reply, Package::TransactionAccepted { index: 2 });

        let response = TcpChainSource.fetch_chain(&addr, timeout).unwrap();
        assert_eq!(response.length, 1);
        assert_eq!(response.chain, blockchain.get_chain().unwrap().0);
    }

    #[test]
    fn test_trickling_peer_is_cut_off_at_the_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                for byte in br#"{"type":"chain","chain":[{"index":1,"previous_hash":"1"#.iter() {
                    if stream.write_all(&[*byte]).is_err() {
                        break;
                    }
                    thread::sleep(Duration::from_millis(100));
                }
            }
        });

        let started = Instant::now();
        let err = TcpChainSource
            .fetch_chain(&addr, Duration::from_millis(500))
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(err, BlockchainError::PeerUnreachable { .. }));
    }

    #[test]
    fn test_reply_size_is_capped() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all(br#"{"type":"error","message":""#);
                let chunk = vec![b'a'; 1024 * 1024];
                for _ in 0..=MAX_REPLY_BYTES / chunk.len() as u64 {
                    if stream.write_all(&chunk).is_err() {
                        break;
                    }
                }
                let _ = stream.write_all(br#""}"#);
            }
        });

        let err = send_request(&addr, &Package::GetChain, Duration::from_secs(20)).unwrap_err();
        assert!(matches!(err, BlockchainError::PeerProtocol { .. }));
    }

    #[test]
    fn test_unreachable_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpChainSource
            .fetch_chain(&addr, Duration::from_millis(500))
            .unwrap_err();
        assert!(matches!(err, BlockchainError::PeerUnreachable { .. }));
    }
}
