//! The git commands gitbridge knows how to run.
//!
//! Each operation is a thin specialization of [`GitProcess::invoke`]: it
//! picks a placement (outside the enlistment, in the working tree, or
//! against `.git`), composes the command text, and optionally interprets the
//! result. Caller-supplied names, urls, and paths are always quoted.

use crate::config::Config;
use crate::enlistment::Enlistment;
use crate::error::{GitBridgeError, Result};
use crate::git::config_result::{ConfigResult, ConfigSettings, MultiConfigResult, parse_key_values};
use crate::git::invoke::InvocationRequest;
use crate::git::launch::{quote, quote_path};
use crate::git::process::GitProcess;
use crate::git::result::GitResult;
use crate::git::version::GitVersion;
use crate::platform::FileSystem;
use chrono::{Duration, Local};
use std::io::{self, Write};
use std::path::Path;

/// Namespace background fetches write into instead of `refs/remotes`.
pub const HIDDEN_REFS_PREFIX: &str = "refs/scalar/hidden";

/// Pack subdirectory of an objects directory.
const PACK_DIR: &str = "pack";

/// `--expire-time` for commit-graph writes: files touched since yesterday
/// may still be part of the chain.
pub fn expire_time_date_string() -> String {
    (Local::now() - Duration::days(1)).format("%Y-%m-%d").to_string()
}

/// Refspec that mirrors a remote's branches into the hidden namespace.
pub fn hidden_refspec(remote: &str) -> String {
    format!("+refs/heads/*:{}/{}/*", HIDDEN_REFS_PREFIX, remote)
}

impl GitProcess {
    /// `git init` for a new enlistment, run from outside it.
    pub fn init(enlistment: &Enlistment, config: &Config) -> Result<GitResult> {
        let process = Self::for_enlistment(enlistment, config)?;
        let command = format!("init {}", quote_path(enlistment.working_directory_root()));
        Ok(process.run(process.outside_enlistment(command)))
    }

    pub fn sparse_checkout_init(enlistment: &Enlistment, config: &Config) -> Result<GitResult> {
        let process = Self::for_enlistment(enlistment, config)?;
        Ok(process.run(process.in_working_directory_root("sparse-checkout init --cone", true)))
    }

    pub fn get_from_global_config(config: &Config, setting_name: &str) -> Result<ConfigResult> {
        Self::get_outside_any_enlistment(config, "--global", setting_name)
    }

    pub fn get_from_system_config(config: &Config, setting_name: &str) -> Result<ConfigResult> {
        Self::get_outside_any_enlistment(config, "--system", setting_name)
    }

    fn get_outside_any_enlistment(config: &Config, scope: &str, setting_name: &str) -> Result<ConfigResult> {
        let process = Self::new(config, None)?;
        let command = format!("config {} {}", scope, quote(setting_name));
        let result = process.run(process.outside_enlistment(command));
        Ok(ConfigResult::new(result, setting_name))
    }

    /// The installed git's version.
    ///
    /// # Errors
    ///
    /// `ExternalTool` when git fails or prints something unrecognizable.
    pub fn try_get_version(config: &Config) -> Result<GitVersion> {
        let process = Self::new(config, None)?;
        let result = process.run(process.outside_enlistment("--version"));

        if result.exit_code_is_success()
            && let Some(version) = GitVersion::parse(&result.stdout)
        {
            return Ok(version);
        }

        Err(GitBridgeError::ExternalTool(format!(
            "Unable to determine installed git version. {}",
            result.stdout
        )))
    }

    /// Read a setting with git's normal scope resolution.
    ///
    /// Runs against `.git` when the working tree exists and
    /// `force_outside_enlistment` is false; otherwise runs outside any
    /// repository (the enlistment may not have been cloned yet).
    pub fn get_from_config(
        &self,
        setting_name: &str,
        force_outside_enlistment: bool,
        file_system: &dyn FileSystem,
    ) -> ConfigResult {
        let command = format!("config {}", quote(setting_name));
        let inside = !force_outside_enlistment
            && self
                .working_directory_root()
                .is_some_and(|root| file_system.directory_exists(root));

        let launch = if inside {
            self.against_dot_git_folder(command)
        } else {
            self.outside_enlistment(command)
        };
        ConfigResult::new(self.run(launch), setting_name)
    }

    pub fn get_from_local_config(&self, setting_name: &str) -> ConfigResult {
        let command = format!("config --local {}", quote(setting_name));
        ConfigResult::new(self.run(self.against_dot_git_folder(command)), setting_name)
    }

    pub fn get_origin_url(&self) -> ConfigResult {
        self.get_from_local_config("remote.origin.url")
    }

    pub fn delete_from_local_config(&self, setting_name: &str) -> GitResult {
        let command = format!("config --local --unset-all {}", quote(setting_name));
        self.run(self.against_dot_git_folder(command))
    }

    pub fn set_in_local_config(&self, setting_name: &str, value: &str, replace_all: bool, add: bool) -> GitResult {
        let mut command = String::from("config --local");
        if replace_all {
            command.push_str(" --replace-all");
        }
        if add {
            command.push_str(" --add");
        }
        command = format!("{} {} {}", command, quote(setting_name), quote(value));
        self.run(self.against_dot_git_folder(command))
    }

    /// Settings in `section` that apply to `repository_url`.
    pub fn try_get_config_url_match(&self, section: &str, repository_url: &str) -> Result<ConfigSettings> {
        let command = format!(
            "config --get-urlmatch {} {}",
            quote(section),
            quote(repository_url)
        );
        let result = self.run(self.against_dot_git_folder(command)).into_checked()?;
        Ok(parse_key_values(&result.stdout, ' '))
    }

    /// Every setting git can see, or only the repository-local ones.
    pub fn try_get_all_config(&self, local_only: bool) -> Result<ConfigSettings> {
        let command = if local_only {
            "config --list --local"
        } else {
            "config --list"
        };
        let result = ConfigResult::new(self.run(self.against_dot_git_folder(command)), "--list");
        let output = result.try_parse_as_string(Some(""))?.unwrap_or_default();
        Ok(parse_key_values(&output, '='))
    }

    pub fn get_multi_config(&self, setting_name: &str) -> MultiConfigResult {
        let command = format!("config --local --get-all {}", quote(setting_name));
        MultiConfigResult::new(self.run(self.against_dot_git_folder(command)))
    }

    pub fn create_branch_with_upstream(&self, branch_to_create: &str, upstream_branch: &str) -> GitResult {
        let command = format!(
            "branch {} --track {}",
            quote(branch_to_create),
            quote(upstream_branch)
        );
        self.run(self.in_working_directory_root(command, true))
    }

    pub fn force_checkout(&self, target: &str) -> GitResult {
        let command = format!("checkout -f {}", quote(target));
        self.run(self.in_working_directory_root(command, true))
    }

    /// Fetch `remote` with the configured refspecs. Never prompts.
    pub fn foreground_fetch(&self, remote: &str) -> GitResult {
        let command = format!("-c credential.interactive=never fetch {} --quiet", quote(remote));
        self.run(self.in_working_directory_root(command, true).interactive(false))
    }

    /// Fetch `remote` into the hidden namespace only.
    ///
    /// `--refmap=` overrides the configured refspec, so the user's
    /// `refs/remotes` are left for a foreground fetch to update.
    pub fn background_fetch(&self, remote: &str) -> GitResult {
        let command = format!(
            "-c credential.interactive=never fetch {} --quiet --prune --no-tags --refmap= {}",
            quote(remote),
            quote(&hidden_refspec(remote))
        );
        self.run(self.in_working_directory_root(command, true).interactive(false))
    }

    /// Names of the configured remotes.
    pub fn try_get_remotes(&self) -> Result<Vec<String>> {
        let result = self.run(self.in_working_directory_root("remote", false)).into_checked()?;
        Ok(result
            .stdout
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn gvfs_helper_download_commit(&self, commit_id: &str) -> GitResult {
        let input = format!("{}\n", commit_id);
        self.invoke(
            InvocationRequest::new(self.in_working_directory_root("gvfs-helper -f post", false))
                .with_stdin(move |stdin: &mut dyn Write| stdin.write_all(input.as_bytes())),
        )
    }

    pub fn gvfs_helper_prefetch(&self) -> GitResult {
        let command = if cfg!(windows) {
            "-c http.sslBackend=schannel gvfs-helper prefetch"
        } else {
            "gvfs-helper prefetch"
        };
        self.run(self.in_working_directory_root(command, false))
    }

    /// Pack the objects `write_objects` names into
    /// `{objects_directory}/pack/{filename_prefix}-*.pack`.
    pub fn pack_objects<F>(&self, filename_prefix: &str, objects_directory: &Path, write_objects: F) -> GitResult
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let pack_path = objects_directory.join(PACK_DIR).join(filename_prefix);
        // Without paths git can't find good deltas, so don't search for them.
        let command = format!(
            "pack-objects {} --non-empty --window=0 --depth=0 -q",
            quote_path(&pack_path)
        );
        let launch = self
            .against_dot_git_folder(command)
            .object_directory(Some(objects_directory.to_path_buf()));
        self.invoke(InvocationRequest::new(launch).with_stdin(write_objects))
    }

    /// Write a split commit-graph reachable from refs, expiring stale
    /// graph files.
    pub fn write_commit_graph(&self, object_dir: &Path) -> GitResult {
        let command = format!(
            "commit-graph write --reachable --split --size-multiple=4 --expire-time={} --object-dir {}",
            expire_time_date_string(),
            quote_path(object_dir)
        );
        self.run(self.in_working_directory_root(command, true))
    }

    pub fn verify_commit_graph(&self, object_dir: &Path) -> GitResult {
        let command = format!("commit-graph verify --shallow --object-dir {}", quote_path(object_dir));
        self.run(self.in_working_directory_root(command, true))
    }

    pub fn index_pack(&self, packfile_path: &Path, idx_output_path: &Path) -> GitResult {
        let command = format!(
            "index-pack -o {} {}",
            quote_path(idx_output_path),
            quote_path(packfile_path)
        );
        self.run(self.against_dot_git_folder(command))
    }

    /// Write a multi-pack-index, even when reading it is disabled.
    pub fn write_multi_pack_index(&self, object_dir: &Path) -> GitResult {
        let command = format!(
            "-c core.multiPackIndex=true multi-pack-index write --object-dir={}",
            quote_path(object_dir)
        );
        self.run(self.against_dot_git_folder(command))
    }

    pub fn verify_multi_pack_index(&self, object_dir: &Path) -> GitResult {
        let command = format!(
            "-c core.multiPackIndex=true multi-pack-index verify --object-dir={}",
            quote_path(object_dir)
        );
        self.run(self.against_dot_git_folder(command))
    }

    pub fn multi_pack_index_expire(&self, object_dir: &Path) -> GitResult {
        let command = format!("multi-pack-index expire --object-dir={}", quote_path(object_dir));
        self.run(self.against_dot_git_folder(command))
    }

    pub fn multi_pack_index_repack(&self, object_dir: &Path, batch_size: &str) -> GitResult {
        let command = format!(
            "-c pack.threads=1 -c repack.packKeptObjects=true multi-pack-index repack --object-dir={} --batch-size={}",
            quote_path(object_dir),
            quote(batch_size)
        );
        self.run(self.against_dot_git_folder(command))
    }

    pub fn remote_add(&self, remote_name: &str, url: &str) -> GitResult {
        let command = format!("remote add {} {}", quote(remote_name), quote(url));
        self.run(self.against_dot_git_folder(command))
    }

    pub fn prune_packed(&self, objects_directory: &Path) -> GitResult {
        let launch = self
            .against_dot_git_folder("prune-packed -q")
            .object_directory(Some(objects_directory.to_path_buf()));
        self.run(launch)
    }
}
