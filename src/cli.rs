//! Interface de linha de comando do btp-provider baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (create, update,
//! delete, job-status) e flags globais (--config, --timeout-secs, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// btp-provider: aplica recursos declarativos nas APIs do SAP BTP.
#[derive(Debug, Parser)]
#[command(name = "btp-provider", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./btp.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Sobrescreve o tempo máximo de espera por um job, em segundos
    /// (também o da remoção de sub accounts).
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cria o recurso descrito no arquivo.
    Create {
        /// Arquivo JSON ou TOML com a definição do recurso.
        #[arg(long)]
        file: PathBuf,
    },

    /// Atualiza o recurso descrito no arquivo.
    Update {
        #[arg(long)]
        file: PathBuf,

        /// Identificador retornado pelo create.
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove o recurso (envia o estado desabilitado/zerado).
    Delete {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        id: Option<String>,
    },

    /// Consulta o estado atual de um job de entitlements.
    JobStatus {
        /// Identificador do job.
        job_id: String,
    },
}
