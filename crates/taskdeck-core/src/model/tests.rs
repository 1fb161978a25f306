use crate::model::*;

#[test]
fn test_priority_ordering_values() {
    assert_eq!(Priority::High.as_i64(), 1);
    assert_eq!(Priority::Medium.as_i64(), 2);
    assert_eq!(Priority::Low.as_i64(), 3);
    assert_eq!(Priority::VeryLow.as_i64(), 4);
}

#[test]
fn test_priority_default_is_low() {
    assert_eq!(Priority::default(), Priority::Low);
}

#[test]
fn test_priority_serializes_as_integer() {
    let json = serde_json::to_string(&Priority::High).unwrap();
    assert_eq!(json, "1");
    let parsed: Priority = serde_json::from_str("4").unwrap();
    assert_eq!(parsed, Priority::VeryLow);
}

#[test]
fn test_priority_rejects_out_of_range() {
    assert!(serde_json::from_str::<Priority>("0").is_err());
    assert!(serde_json::from_str::<Priority>("5").is_err());
}

#[test]
fn test_iso_duration_parse_full() {
    let d: IsoDuration = "P1DT2H30M15S".parse().unwrap();
    assert_eq!(d.num_seconds(), 86_400 + 2 * 3_600 + 30 * 60 + 15);
}

#[test]
fn test_iso_duration_parse_time_only() {
    let d: IsoDuration = "PT90S".parse().unwrap();
    assert_eq!(d.num_seconds(), 90);
}

#[test]
fn test_iso_duration_parse_weeks() {
    let d: IsoDuration = "P2W".parse().unwrap();
    assert_eq!(d.num_seconds(), 2 * 7 * 86_400);
}

#[test]
fn test_iso_duration_display_roundtrip() {
    for s in ["PT0S", "PT45M", "P3D", "P1DT2H30M15S", "PT3H"] {
        let d: IsoDuration = s.parse().unwrap();
        assert_eq!(d.to_string(), *s, "roundtrip for {s}");
    }
}

#[test]
fn test_iso_duration_normalizes_on_format() {
    // 90 seconds formats as 1 minute 30 seconds
    let d: IsoDuration = "PT90S".parse().unwrap();
    assert_eq!(d.to_string(), "PT1M30S");
}

#[test]
fn test_iso_duration_rejects_garbage() {
    for s in ["", "P", "PT", "1H", "P1H", "PTS", "PT1X", "P1D5"] {
        assert!(s.parse::<IsoDuration>().is_err(), "should reject '{s}'");
    }
}

#[test]
fn test_iso_duration_rejects_overflow() {
    // i64::MAX weeks, and two parts whose sum overflows
    for s in [
        "P9223372036854775807W",
        "P9223372036854775807DT9223372036854775807S",
        "P106751991167301D",
    ] {
        let err = s.parse::<IsoDuration>().unwrap_err();
        assert!(err.contains("out of range"), "should overflow: '{s}'");
    }
    // largest representable number of days still parses
    assert!("P106751991167300D".parse::<IsoDuration>().is_ok());
}

#[test]
fn test_iso_duration_rejects_out_of_order_designators() {
    // minutes before hours is not valid ISO-8601
    assert!("PT30M2H".parse::<IsoDuration>().is_err());
}

#[test]
fn test_iso_duration_serde_as_string() {
    let d = IsoDuration::from_seconds(3_600);
    let json = serde_json::to_string(&d).unwrap();
    assert_eq!(json, "\"PT1H\"");
    let parsed: IsoDuration = serde_json::from_str("\"PT1H\"").unwrap();
    assert_eq!(parsed, d);
}

#[test]
fn test_validate_task_input_ok() {
    let input = TaskInput {
        title: "Write report".to_string(),
        description: None,
        owner: 1,
        project_id: None,
        due_date: None,
        duration: None,
        priority: Priority::default(),
    };
    assert!(validate_task_input(&input).is_ok());
}

#[test]
fn test_validate_task_input_empty_title() {
    let input = TaskInput {
        title: "   ".to_string(),
        description: None,
        owner: 1,
        project_id: None,
        due_date: None,
        duration: None,
        priority: Priority::default(),
    };
    assert!(validate_task_input(&input).is_err());
}

#[test]
fn test_validate_task_input_title_too_long() {
    let input = TaskInput {
        title: "x".repeat(MAX_TITLE_LENGTH + 1),
        description: None,
        owner: 1,
        project_id: None,
        due_date: None,
        duration: None,
        priority: Priority::default(),
    };
    assert!(validate_task_input(&input).is_err());
}

#[test]
fn test_validate_user_input() {
    let ok = UserInput {
        username: "alice".into(),
        email: "alice@example.com".into(),
    };
    assert!(validate_user_input(&ok).is_ok());

    let bad_email = UserInput {
        username: "alice".into(),
        email: "not-an-email".into(),
    };
    assert!(validate_user_input(&bad_email).is_err());

    let empty_name = UserInput {
        username: "".into(),
        email: "a@b.com".into(),
    };
    assert!(validate_user_input(&empty_name).is_err());
}

#[test]
fn test_validate_project_input() {
    let ok = ProjectInput {
        name: "Website relaunch".into(),
        description: Some("Q3 marketing site".into()),
    };
    assert!(validate_project_input(&ok).is_ok());

    let empty = ProjectInput {
        name: " ".into(),
        description: None,
    };
    assert!(validate_project_input(&empty).is_err());
}

#[test]
fn test_validate_message_limits() {
    assert!(validate_message("hello").is_ok());
    assert!(validate_message("").is_err());
    assert!(validate_message("  \n ").is_err());
    assert!(validate_message(&"x".repeat(MAX_MESSAGE_LENGTH)).is_ok());
    assert!(validate_message(&"x".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
}

#[test]
fn test_validate_chat_input_title_limit() {
    assert!(validate_chat_input(&ChatInput { title: None }).is_ok());
    assert!(validate_chat_input(&ChatInput {
        title: Some("standup notes".into())
    })
    .is_ok());
    assert!(validate_chat_input(&ChatInput {
        title: Some("x".repeat(MAX_CHAT_TITLE_LENGTH + 1))
    })
    .is_err());
}

#[test]
fn test_task_input_serde_defaults() {
    let json = r#"{"title": "Minimal", "owner": 7}"#;
    let input: TaskInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.title, "Minimal");
    assert_eq!(input.owner, 7);
    assert!(input.project_id.is_none());
    assert!(input.due_date.is_none());
    assert!(input.duration.is_none());
    assert_eq!(input.priority, Priority::Low);
}

#[test]
fn test_task_detail_json_shape() {
    let task = Task {
        id: 5,
        title: "Ship release".into(),
        description: Some("cut the tag".into()),
        owner: 2,
        project_id: Some(3),
        creation_date: chrono::Utc::now(),
        due_date: None,
        duration: Some(IsoDuration::from_seconds(7_200)),
        priority: Priority::High,
    };
    let detail = TaskDetail {
        task,
        owner_detail: User {
            id: 2,
            username: "bob".into(),
            email: "bob@example.com".into(),
        },
        project: Some(Project {
            id: 3,
            name: "Release train".into(),
            description: None,
        }),
    };

    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["id"], 5);
    assert_eq!(json["owner"], 2);
    assert_eq!(json["owner_detail"]["username"], "bob");
    assert_eq!(json["project"]["name"], "Release train");
    assert_eq!(json["project_id"], 3);
    assert_eq!(json["duration"], "PT2H");
    assert_eq!(json["priority"], 1);
}

#[test]
fn test_chat_detail_json_shape() {
    let detail = ChatDetail {
        chat: Chat {
            id: 1,
            title: None,
            created_at: chrono::Utc::now(),
        },
        messages: vec![ChatMessage {
            id: 10,
            chat_id: 1,
            message: "hi".into(),
            is_bot: false,
            created_at: chrono::Utc::now(),
        }],
    };
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["id"], 1);
    assert!(json["title"].is_null());
    assert_eq!(json["messages"][0]["message"], "hi");
    assert_eq!(json["messages"][0]["is_bot"], false);
}
