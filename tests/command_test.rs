use parley::commands::{is_command, parse, Command, CommandError};

#[test]
fn test_is_command() {
    assert!(is_command("/help"));
    assert!(is_command("  /exit"));
    assert!(!is_command("hello there"));
    assert!(!is_command("what does /help do?"));
}

#[test]
fn test_simple_verbs() {
    assert_eq!(parse("/help").unwrap(), Command::Help);
    assert_eq!(parse("/clear").unwrap(), Command::Clear);
    assert_eq!(parse("/exit").unwrap(), Command::Exit);
}

#[test]
fn test_unknown_verb_mentions_help() {
    let err = parse("/frobnicate").unwrap_err();
    assert_eq!(err, CommandError::Unknown("/frobnicate".to_string()));
    assert!(err.to_string().contains("/help"));
}

#[test]
fn test_system_with_and_without_text() {
    assert_eq!(parse("/system").unwrap(), Command::System(None));
    assert_eq!(
        parse("/system You are a pirate.").unwrap(),
        Command::System(Some("You are a pirate.".to_string()))
    );
}

#[test]
fn test_config_show_and_set() {
    assert_eq!(parse("/config").unwrap(), Command::ConfigShow);
    assert_eq!(
        parse("/config model=gpt-4").unwrap(),
        Command::ConfigSet {
            key: "model".to_string(),
            value: "gpt-4".to_string(),
        }
    );
}

#[test]
fn test_config_value_may_contain_equals() {
    assert_eq!(
        parse("/config system_prompt=a=b=c").unwrap(),
        Command::ConfigSet {
            key: "system_prompt".to_string(),
            value: "a=b=c".to_string(),
        }
    );
}

#[test]
fn test_config_without_equals_is_a_usage_error() {
    assert!(matches!(
        parse("/config model gpt-4"),
        Err(CommandError::Usage(_))
    ));
    assert!(matches!(
        parse("/config =value"),
        Err(CommandError::Usage(_))
    ));
}

#[test]
fn test_reset_config() {
    assert_eq!(parse("/reset config").unwrap(), Command::ConfigReset);
    assert!(matches!(parse("/reset"), Err(CommandError::Usage(_))));
    assert!(matches!(
        parse("/reset everything"),
        Err(CommandError::Usage(_))
    ));
}

#[test]
fn test_profile_overview_and_list() {
    assert_eq!(parse("/profile").unwrap(), Command::ProfileOverview);
    assert_eq!(parse("/profile list").unwrap(), Command::ProfileList);
}

#[test]
fn test_profile_use() {
    assert_eq!(
        parse("/profile use work").unwrap(),
        Command::ProfileUse("work".to_string())
    );
    assert!(matches!(parse("/profile use"), Err(CommandError::Usage(_))));
}

#[test]
fn test_profile_create_with_and_without_seed() {
    assert_eq!(
        parse("/profile create work").unwrap(),
        Command::ProfileCreate {
            name: "work".to_string(),
            from_current: false,
        }
    );
    assert_eq!(
        parse("/profile create work --from-current").unwrap(),
        Command::ProfileCreate {
            name: "work".to_string(),
            from_current: true,
        }
    );
}

#[test]
fn test_profile_clone_and_delete() {
    assert_eq!(
        parse("/profile clone a b").unwrap(),
        Command::ProfileClone {
            src: "a".to_string(),
            dest: "b".to_string(),
        }
    );
    assert_eq!(
        parse("/profile delete work").unwrap(),
        Command::ProfileDelete("work".to_string())
    );
    assert!(matches!(
        parse("/profile clone only-one"),
        Err(CommandError::Usage(_))
    ));
}

#[test]
fn test_profile_show() {
    assert_eq!(parse("/profile show").unwrap(), Command::ProfileShow(None));
    assert_eq!(
        parse("/profile show work").unwrap(),
        Command::ProfileShow(Some("work".to_string()))
    );
}

#[test]
fn test_profile_unknown_subcommand_is_a_usage_error() {
    assert!(matches!(
        parse("/profile explode"),
        Err(CommandError::Usage(_))
    ));
}
