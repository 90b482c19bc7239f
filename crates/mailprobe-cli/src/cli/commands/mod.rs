use super::args::*;

pub mod routes;
pub mod run;
pub mod serve;
pub mod url_check;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Serve(args) => serve::run(args).await,
        Command::Run(args) => run::run(args).await,
        Command::Routes(args) => routes::run(args),
        Command::UrlCheck => url_check::run(),
    }
}
