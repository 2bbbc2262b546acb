//! Interface de terminal do btp-provider: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`OperationProgress`] acompanha visualmente
//! uma reconciliação no terminal.

use std::process::ExitCode;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::ProviderError;
use crate::reconcile::{JobState, JobStatus, ReconcileReport};
use crate::resources::ResourceState;

/// Indicador visual de progresso para uma operação de recurso.
///
/// Exibe um spinner animado enquanto o job é aguardado e mensagens
/// coloridas para sucesso (verde), falha (vermelho) e timeout (amarelo).
pub struct OperationProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl OperationProgress {
    /// Inicia o spinner com a descrição da operação.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        // Template fixo; em caso de erro fica o estilo padrão.
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(description.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow().bold(),
        }
    }

    /// Finaliza o spinner, exibe o resultado da operação uma única vez e
    /// devolve o código de saída do processo.
    ///
    /// Timeout aparece em amarelo: o estado remoto é desconhecido, não falho.
    pub fn complete(&self, result: &Result<ResourceState, ProviderError>) -> ExitCode {
        self.pb.finish_and_clear();
        match result {
            Ok(state) => {
                println!("  {} Resource {} reconciled", self.green.apply_to("✓"), state.id);
                return ExitCode::SUCCESS;
            }
            Err(e) if e.is_timeout() => {
                println!("  {} {e}", self.yellow.apply_to("⧗"));
            }
            Err(e) => {
                println!("  {} {e}", self.red.apply_to("✗"));
            }
        }
        ExitCode::FAILURE
    }

    /// Imprime o relatório da reconciliação em JSON.
    pub fn print_report(&self, report: &ReconcileReport) {
        let style = if report.succeeded { &self.green } else { &self.red };
        println!();
        println!("{}", style.apply_to("─── Reconcile Report ───"));
        println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
    }
}

/// Imprime o estado de um job consultado com `job-status`.
pub fn print_job_state(job_id: &str, state: &JobState) {
    let style = match state.status {
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Failed | JobStatus::Unrecognized(_) => Style::new().red().bold(),
        JobStatus::InProgress => Style::new().yellow(),
    };
    println!("  job {job_id}: {}", style.apply_to(&state.status));
    if !state.description.is_empty() {
        println!("  {}", state.description);
    }
}
