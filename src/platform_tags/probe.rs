use crate::prelude::*;

use async_trait::async_trait;
use futures::future::join_all;
use std::process::Stdio;
use tokio::process::Command;

/// Something that can run a shell command and hand back what it printed.
#[async_trait]
pub trait Exec: Sync {
    /// Returns stdout if the command ran and exited successfully, and an error
    /// otherwise (including plain old non-zero exit).
    async fn exec(&self, command: &str) -> Result<String>;
}

/// Runs commands for real, via `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Shell;

#[async_trait]
impl Exec for Shell {
    async fn exec(&self, command: &str) -> Result<String> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .wrap_err_with(|| format!("failed to run {:?}", command))?;
        if !output.status.success() {
            bail!("{:?} failed: {}", command, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs every command at once, waits for all of them, and returns the output of the
/// first one *in list order* that succeeded -- so a slow high-priority command still
/// beats a fast low-priority one. Failures are only ever logged.
pub async fn first_success<E, S>(exec: &E, commands: &[S]) -> Option<String>
where
    E: Exec + ?Sized,
    S: AsRef<str>,
{
    let outcomes = join_all(commands.iter().map(|c| exec.exec(c.as_ref()))).await;
    let mut winner = None;
    for (command, outcome) in commands.iter().zip(outcomes) {
        match outcome {
            Ok(output) if winner.is_none() => {
                debug!("probe {:?} succeeded", command.as_ref());
                winner = Some(output);
            }
            Ok(_) => trace!("probe {:?} also succeeded (ignored)", command.as_ref()),
            Err(err) => trace!("probe failed: {:#}", err),
        }
    }
    winner
}

/// A canned-answers runner for tests. Unknown commands fail.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FakeExec {
    answers: std::collections::HashMap<String, String>,
    log: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl FakeExec {
    pub fn with(mut self, command: &str, output: &str) -> FakeExec {
        self.answers.insert(command.into(), output.into());
        self
    }

    pub fn ran(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Exec for FakeExec {
    async fn exec(&self, command: &str) -> Result<String> {
        self.log.lock().unwrap().push(command.into());
        match self.answers.get(command) {
            Some(output) => Ok(output.clone()),
            None => bail!("no such command: {}", command),
        }
    }
}
