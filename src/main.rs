use std::sync::Arc;
use log::{debug, error, info};
use gpt5_server::config::{self, ServerConfig};
use gpt5_server::{server, Dispatcher};

#[tokio::main(flavor = "current_thread")]
async fn main()
{   let env_file = config::load_env_file();

    // stdout carries protocol frames; env_logger writes to stderr
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    match env_file
    {   Some(path) => info!("Environment loaded from: {}", path.display())
      , None => debug!("No .env file found")
    }

    let config = match ServerConfig::from_env()
    {   Ok(c) => c
      , Err(e) => {
          error!("Error: {}", e);
          error!("Please set it in .env file or as an environment variable");
          std::process::exit(1);
        }
    };

    info!("Starting GPT-5 MCP server");
    let dispatcher = Arc::new(Dispatcher::from_config(&config));

    let code = match server::run(dispatcher).await
    {   Ok(()) => {
          info!("GPT-5 MCP server stopped");
          0
        }
      , Err(e) => {
          error!("Server runtime error: {}", e);
          1
        }
    };

    // A pending stdin read would otherwise block runtime teardown
    std::process::exit(code);
}
