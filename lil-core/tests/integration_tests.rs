use lil_core::*;
use std::path::PathBuf;

#[test]
fn test_container_id_validation() {
    // Valid IDs
    assert!(ContainerId::new("test").is_ok());
    assert!(ContainerId::new("test-123").is_ok());
    assert!(ContainerId::new("test_456").is_ok());
    assert!(ContainerId::new("lilContainer").is_ok());

    // Invalid IDs - empty
    assert!(ContainerId::new("").is_err());

    // Invalid IDs - too long for a hostname
    assert!(ContainerId::new("a".repeat(65)).is_err());

    // Invalid IDs - would escape the cgroup root or break the hostname
    assert!(ContainerId::new("test/path").is_err());
    assert!(ContainerId::new("../escape").is_err());
    assert!(ContainerId::new("test space").is_err());
    assert!(ContainerId::new("test.dot").is_err());
}

#[test]
fn test_container_id_errors_are_usage_errors() {
    let err = ContainerId::new("bad/id").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_options_follow_container_id() {
    let options = ConfinementOptions {
        container_id: ContainerId::new("run-42").unwrap(),
        cgroup_root: PathBuf::from("/tmp/cg"),
        ..ConfinementOptions::default()
    };

    assert_eq!(options.cgroup_path(), PathBuf::from("/tmp/cg/run-42"));
    assert_eq!(options.pids_limit, PidsLimit::DEFAULT);
    assert_eq!(options.membership, MembershipTarget::Parent);
}

#[test]
fn test_stage_selectors() {
    let command = TargetCommand::new(vec!["echo".to_string(), "hi".to_string()]).unwrap();
    let launch = Stage::Launch {
        options: ConfinementOptions::default(),
        command,
        cleanup: false,
    };

    assert_eq!(launch.selector(), "run");
    assert_eq!(launch.next().map(|s| s.selector()), Some("child"));
}

#[test]
fn test_forwarded_args_are_verbatim() {
    let argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo $$ --name x".to_string(),
    ];
    let stage = Stage::Bootstrap {
        options: ConfinementOptions::default(),
        command: TargetCommand::new(argv.clone()).unwrap(),
    };

    let args = stage.to_args();
    let tail: Vec<String> = args[args.len() - argv.len()..]
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert_eq!(tail, argv);
}
