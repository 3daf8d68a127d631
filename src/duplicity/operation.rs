use crate::args::{self, BuildContext, CommandKind, Invocation};
use crate::error::Result;
use crate::options::{
    FullOptions, IncrOptions, ListCurrentFilesOptions, RemoveAllButNFullOptions,
    RemoveOlderThanOptions, VerifyOptions,
};
use crate::parser;
use crate::results::{
    BackupResults, ConsoleOutput, ListCurrentFilesResults, RemoveAllButNFullResults,
    RemoveOlderThanResults, VerifyResults,
};
use crate::subprocess::ProcessOutput;

/// A duplicity command: how to invoke it and how to read its output.
///
/// `parse` is only called for runs that exited successfully.
pub trait Operation: Send + Sync {
    type Output: Send;

    const KIND: CommandKind;

    fn build(&self, ctx: &BuildContext) -> Result<Invocation>;

    fn parse(&self, output: ProcessOutput) -> Result<Self::Output>;
}

fn rc(output: &ProcessOutput) -> i32 {
    output.status.code().unwrap_or_default()
}

fn backup_results(kind: CommandKind, output: ProcessOutput) -> Result<BackupResults> {
    let statistics = parser::parse_backup_statistics(&output.stdout, kind)?;
    Ok(BackupResults {
        rc: rc(&output),
        command: kind.keyword().to_string(),
        statistics,
        output: output.into(),
    })
}

impl Operation for FullOptions {
    type Output = BackupResults;
    const KIND: CommandKind = CommandKind::Full;

    fn build(&self, ctx: &BuildContext) -> Result<Invocation> {
        args::build_full(self, ctx)
    }

    fn parse(&self, output: ProcessOutput) -> Result<BackupResults> {
        backup_results(Self::KIND, output)
    }
}

impl Operation for IncrOptions {
    type Output = BackupResults;
    const KIND: CommandKind = CommandKind::Incr;

    fn build(&self, ctx: &BuildContext) -> Result<Invocation> {
        args::build_incr(self, ctx)
    }

    fn parse(&self, output: ProcessOutput) -> Result<BackupResults> {
        backup_results(Self::KIND, output)
    }
}

impl Operation for VerifyOptions {
    type Output = VerifyResults;
    const KIND: CommandKind = CommandKind::Verify;

    fn build(&self, ctx: &BuildContext) -> Result<Invocation> {
        args::build_verify(self, ctx)
    }

    fn parse(&self, output: ProcessOutput) -> Result<VerifyResults> {
        let summary = parser::parse_verify(&output.stdout)?;
        Ok(VerifyResults {
            rc: rc(&output),
            command: Self::KIND.keyword().to_string(),
            files_compared: summary.files_compared,
            differences_found: summary.differences_found,
            last_full_backup_date: summary.last_full_backup_date,
            output: output.into(),
        })
    }
}

impl Operation for ListCurrentFilesOptions {
    type Output = ListCurrentFilesResults;
    const KIND: CommandKind = CommandKind::ListCurrentFiles;

    fn build(&self, ctx: &BuildContext) -> Result<Invocation> {
        args::build_list_current_files(self, ctx)
    }

    fn parse(&self, output: ProcessOutput) -> Result<ListCurrentFilesResults> {
        let entries = parser::parse_file_listing(&output.stdout)?;
        Ok(ListCurrentFilesResults {
            rc: rc(&output),
            command: Self::KIND.keyword().to_string(),
            entries,
            output: output.into(),
        })
    }
}

impl Operation for RemoveOlderThanOptions {
    type Output = RemoveOlderThanResults;
    const KIND: CommandKind = CommandKind::RemoveOlderThan;

    fn build(&self, ctx: &BuildContext) -> Result<Invocation> {
        args::build_remove_older_than(self, ctx)
    }

    fn parse(&self, output: ProcessOutput) -> Result<RemoveOlderThanResults> {
        let summary = parser::parse_remove_older_than(&output.stdout)?;
        Ok(RemoveOlderThanResults {
            rc: rc(&output),
            command: Self::KIND.keyword().to_string(),
            require_force: summary.require_force,
            entries: summary.entries,
            output: output.into(),
        })
    }
}

impl Operation for RemoveAllButNFullOptions {
    type Output = RemoveAllButNFullResults;
    const KIND: CommandKind = CommandKind::RemoveAllButNFull;

    fn build(&self, ctx: &BuildContext) -> Result<Invocation> {
        args::build_remove_all_but_n_full(self, ctx)
    }

    fn parse(&self, output: ProcessOutput) -> Result<RemoveAllButNFullResults> {
        Ok(RemoveAllButNFullResults {
            rc: rc(&output),
            command: Self::KIND.keyword().to_string(),
            require_force: parser::parse_remove_all_but_n_full(&output.stdout),
            output: ConsoleOutput::from(output),
        })
    }
}
