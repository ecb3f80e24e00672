// This is my entry point for the ledger node and its command-line client
use architect_ledger::{
    send_request, Blockchain, ChainStore, Command, Opt, Package, Server, TcpChainSource,
    GLOBAL_CONFIG,
};
use clap::Parser;
use log::{error, info, LevelFilter};
use std::process;
use std::sync::Arc;
use std::time::Duration;

// Mining can take a while, so client requests get a generous budget
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

fn main() {
    // Info level shows blocks being forged and consensus decisions
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let node_addr = opt.node.unwrap_or_else(|| GLOBAL_CONFIG.get_node_addr());

    match opt.command {
        // When I start a node, it owns its ledger for the life of the process
        Command::StartNode { peers } => {
            let options = GLOBAL_CONFIG.node_options();
            let source = Arc::new(TcpChainSource);
            info!("Node identity: {}", options.node_id);

            let blockchain = match GLOBAL_CONFIG.get_data_dir() {
                Some(dir) => {
                    info!("Persisting chain under {}", dir.display());
                    Blockchain::open(options, source, ChainStore::open(dir)?)?
                }
                None => Blockchain::new(options, source),
            };

            for peer in &peers {
                blockchain.register_peer(peer)?;
            }

            let server = Server::new(blockchain);
            server.run(&node_addr)?;
        }
        Command::Mine => {
            print_reply(send_request(&node_addr, &Package::Mine, CLIENT_TIMEOUT)?)?;
        }
        Command::Send {
            sender,
            recipient,
            amount,
        } => {
            let pkg = Package::NewTransaction {
                sender: Some(sender),
                recipient: Some(recipient),
                amount: Some(amount),
            };
            print_reply(send_request(&node_addr, &pkg, CLIENT_TIMEOUT)?)?;
        }
        Command::Chain => {
            print_reply(send_request(&node_addr, &Package::GetChain, CLIENT_TIMEOUT)?)?;
        }
        Command::Register { addresses } => {
            let pkg = Package::RegisterNodes {
                nodes: Some(addresses),
            };
            print_reply(send_request(&node_addr, &pkg, CLIENT_TIMEOUT)?)?;
        }
        Command::Resolve => {
            print_reply(send_request(&node_addr, &Package::Resolve, CLIENT_TIMEOUT)?)?;
        }
    }
    Ok(())
}

// I print replies as pretty JSON; an error reply becomes a non-zero exit
fn print_reply(reply: Package) -> Result<(), Box<dyn std::error::Error>> {
    if let Package::Error { message } = &reply {
        return Err(message.clone().into());
    }
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
