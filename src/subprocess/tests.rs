#[cfg(all(test, unix))]
mod tests {
    use super::super::*;
    use std::path::Path;
    use std::time::Duration;

    #[tokio::test]
    async fn test_production_runner_success() {
        let runner = SubprocessManager::production().runner();
        let command = ProcessCommandBuilder::new("echo")
            .arg("hello world")
            .build();

        let output = runner.run(command).await.unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "hello world");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_production_runner_failure() {
        let command = ProcessCommandBuilder::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .build();

        let output = TokioProcessRunner.run(command).await.unwrap();
        assert_eq!(output.status, ExitStatus::Error(3));
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_production_runner_stdin_is_closed() {
        let command = ProcessCommandBuilder::new("cat").build();

        let output = TokioProcessRunner.run(command).await.unwrap();
        assert!(output.status.success());
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_production_runner_command_not_found() {
        let command = ProcessCommandBuilder::new("nonexistent-command-12345").build();

        let result = TokioProcessRunner.run(command).await;
        assert!(matches!(
            result.unwrap_err(),
            ProcessError::CommandNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_production_runner_timeout() {
        let command = ProcessCommandBuilder::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100))
            .build();

        let result = TokioProcessRunner.run(command).await;
        assert!(matches!(result.unwrap_err(), ProcessError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = ProcessCommandBuilder::new("pwd")
            .current_dir(dir.path())
            .build();

        let output = TokioProcessRunner.run(command).await.unwrap();
        let name = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(output.stdout.trim().ends_with(name));
    }

    #[tokio::test]
    async fn test_suppressed_stderr_is_not_captured() {
        let command = ProcessCommandBuilder::new("sh")
            .args(["-c", "echo noise >&2; echo ok"])
            .suppress_stderr()
            .build();

        let output = TokioProcessRunner.run(command).await.unwrap();
        assert_eq!(output.stdout.trim(), "ok");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_volume_mount_argument() {
        let command = ProcessCommandBuilder::new("docker")
            .volume(Path::new("/src"), Path::new("/workspace"), false)
            .volume(Path::new("/creds.json"), Path::new("/home/node/creds.json"), true)
            .build();
        assert_eq!(
            command.args,
            vec!["-v", "/src:/workspace", "-v", "/creds.json:/home/node/creds.json:ro"]
        );
    }

    #[test]
    fn test_display_quotes_arguments() {
        let command = ProcessCommandBuilder::new("claude")
            .args(["-p", "fix the bug"])
            .build();
        assert_eq!(command.display(), "claude -p 'fix the bug'");
    }
}
