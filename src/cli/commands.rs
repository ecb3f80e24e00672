use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "architect-ledger")]
pub struct Opt {
    #[arg(
        long = "node",
        global = true,
        help = "Address of the node to talk to (defaults to NODE_ADDRESS)"
    )]
    pub node: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a ledger node")]
    StartNode {
        #[arg(long = "peer", help = "Peer to register at startup (repeatable)")]
        peers: Vec<String>,
    },
    #[command(name = "mine", about = "Mine a new block on the node")]
    Mine,
    #[command(name = "send", about = "Submit a transaction to the node")]
    Send {
        #[arg(help = "Sender address")]
        sender: String,
        #[arg(help = "Recipient address")]
        recipient: String,
        #[arg(help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "chain", about = "Print the node's full chain")]
    Chain,
    #[command(name = "register", about = "Register peers with the node")]
    Register {
        #[arg(required = true, help = "Peer addresses (host:port or URL)")]
        addresses: Vec<String>,
    },
    #[command(name = "resolve", about = "Run consensus on the node")]
    Resolve,
}
