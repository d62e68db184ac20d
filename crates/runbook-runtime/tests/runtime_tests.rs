#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use runbook_config::{AgentConfig, RunbookConfig, ShellMode, UnclassifiedPolicy};
    use runbook_core::{
        ContentBlock, ConversationHistory, Message, MessageContent, Result, Role, RunbookError,
        TaskAction, TaskDef,
    };
    use runbook_emulator::UnixEmulator;
    use runbook_llm::{MockProvider, MockResponse, Transcriber};
    use runbook_runtime::*;
    use runbook_store::{InMemoryHistoryStore, InMemoryTaskStore, TaskStore};
    use serde_json::json;

    fn deploy_task() -> TaskDef {
        TaskDef::new("deploy_api", "Deploy the API service")
            .with_commands(["cd /srv/api", "git pull"])
            .with_context("host", json!("api-1"))
    }

    fn emulated_tools(store: Arc<dyn TaskStore>) -> AgentTools {
        AgentTools::new(ShellBackend::Emulated(Mutex::new(UnixEmulator::new())), store)
    }

    /// Every tool result block in the history, in order.
    fn tool_results(history: &ConversationHistory) -> Vec<String> {
        history
            .iter()
            .filter_map(|m| match &m.content {
                MessageContent::Blocks(blocks) => Some(blocks.clone()),
                MessageContent::Text(_) => None,
            })
            .flatten()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    fn assert_alternates(history: &ConversationHistory) {
        assert!(history.is_well_formed(), "history is malformed: {history:#?}");
        assert_eq!(history.as_slice()[0].role, Role::User);
        assert_eq!(history.last().unwrap().role, Role::Assistant);
    }

    // ── Agent loop ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_send_message_ends_turn() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock").with_tool_call("send_message", json!({"message": "Hi there"}));
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("hello", ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(outcome.messages, vec!["Hi there"]);
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.exhausted);
        assert_eq!(tool_results(&outcome.history), vec![MESSAGE_SENT]);
        assert_eq!(outcome.history.len(), 4);
        assert_eq!(outcome.history.last().unwrap().text_content(), WAITING_PLACEHOLDER);
        assert_alternates(&outcome.history);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_before_any_request() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock").with_tool_call("send_message", json!({"message": "Hi"}));
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        for input in ["", "   \n"] {
            let err = AgentLoop::new(&provider, &session, &tools, &config)
                .run_turn(input, ConversationHistory::new())
                .await
                .unwrap_err();
            assert!(matches!(err, RunbookError::Agent(_)));
        }
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_loop_stops_at_iteration_cap() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock")
            .with_fallback(MockResponse::tool_call("run_shell", json!({"command": "pwd"})));
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 12);

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("where am I?", ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(provider.request_count(), 12);
        assert_eq!(outcome.iterations, 12);
        assert!(outcome.exhausted);
        assert!(outcome.messages.is_empty());
        assert_eq!(tool_results(&outcome.history).len(), 12);
        assert!(tool_results(&outcome.history).iter().all(|r| r == "/home/pablo"));
        assert_alternates(&outcome.history);
    }

    #[tokio::test]
    async fn test_continue_prompt_follows_tool_result() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock")
            .with_tool_call("run_shell", json!({"command": "ls"}))
            .with_tool_call("send_message", json!({"message": "The folder holds motionapps"}));
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("what is in my home?", ConversationHistory::new())
            .await
            .unwrap();

        let requests = provider.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.last().unwrap().text_content(), "what is in my home?");
        let second = requests[1].messages.last().unwrap();
        assert!(second.first_block_is_tool_result());
        assert_eq!(second.text_content(), "Next action:");
        assert_eq!(outcome.messages, vec!["The folder holds motionapps"]);
        assert_eq!(tool_results(&outcome.history)[0], "motionapps");
        assert_alternates(&outcome.history);
    }

    #[tokio::test]
    async fn test_plain_text_is_delivered() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock")
            .with_tool_calls(Some("Let me look."), vec![("run_shell", json!({"command": "whoami"}))])
            .with_response("You are pablo.");
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("who am I?", ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(outcome.messages, vec!["Let me look.", "You are pablo."]);
        assert_eq!(outcome.iterations, 2);
        assert_alternates(&outcome.history);
        assert_eq!(outcome.history.last().unwrap().text_content(), "You are pablo.");
    }

    #[tokio::test]
    async fn test_several_tool_calls_in_one_completion_keep_order() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock").with_tool_calls(
            None,
            vec![
                ("send_message", json!({"message": "Checking..."})),
                ("run_shell", json!({"command": "uname -n"})),
                ("send_message", json!({"message": "Done"})),
            ],
        );
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("hostname?", ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(
            tool_results(&outcome.history)[..3],
            [MESSAGE_SENT.to_string(), "ubuntu-server".into(), MESSAGE_SENT.into()]
        );
        assert_eq!(outcome.messages[..2], ["Checking...".to_string(), "Done".into()]);
        assert_eq!(outcome.iterations, 2, "run_shell asks for a follow-up completion");
        assert_alternates(&outcome.history);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock")
            .with_tool_call("delete_everything", json!({}))
            .with_response("Sorry, I cannot do that.");
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("wipe it", ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(tool_results(&outcome.history), vec!["Tool not found: delete_everything"]);
        assert_eq!(outcome.iterations, 2);
        assert_alternates(&outcome.history);
    }

    #[tokio::test]
    async fn test_meta_tools_not_offered_in_task_mode() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new().with_task(deploy_task()));
        let provider = MockProvider::new("mock")
            .with_tool_call("list_tasks", json!({}))
            .with_response("ok");
        let session = AgentSession::for_task("deploy_api", store.clone()).await;
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("list", ConversationHistory::new())
            .await
            .unwrap();

        let offered: Vec<String> = provider.recorded_requests()[0]
            .tools
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(offered, vec!["send_message", "run_shell", "update_tasks"]);
        assert_eq!(tool_results(&outcome.history), vec!["Tool not found: list_tasks"]);
    }

    #[tokio::test]
    async fn test_echo_shell_commands() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock")
            .with_tool_call("run_shell", json!({"command": "pwd"}))
            .with_response("You are in your home directory.");
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig {
            echo_shell_commands: true,
            ..AgentConfig::default()
        };

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("pwd", ConversationHistory::new())
            .await
            .unwrap();
        assert_eq!(
            outcome.messages,
            vec!["running: pwd", "You are in your home directory."]
        );
    }

    #[tokio::test]
    async fn test_update_tasks_through_loop() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock")
            .with_tool_call(
                "update_tasks",
                json!({
                    "action": "add",
                    "task_name": "restart_nginx",
                    "task_data": {"goal": "Restart nginx", "commands": ["sudo systemctl restart nginx"]}
                }),
            )
            .with_tool_call("send_message", json!({"message": "Saved."}));
        let session = AgentSession::for_task("restart_nginx", store.clone()).await;
        let tools = emulated_tools(store.clone());
        let config = AgentConfig::default();

        let outcome = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("remember how to restart nginx", ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(
            tool_results(&outcome.history)[0],
            "Task 'restart_nginx' added successfully"
        );
        let saved = store.load("restart_nginx").await.unwrap().unwrap();
        assert_eq!(saved.name, "restart_nginx");
        assert_eq!(saved.commands, vec!["sudo systemctl restart nginx"]);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let provider = MockProvider::new("mock").with_refusal();
        let session = AgentSession::meta(store.clone());
        let tools = emulated_tools(store);
        let config = AgentConfig::default();

        let err = AgentLoop::new(&provider, &session, &tools, &config)
            .run_turn("something awful", ConversationHistory::new())
            .await
            .unwrap_err();
        assert!(err.is_refusal());
    }

    // ── Tool executor ──────────────────────────────────────────

    #[tokio::test]
    async fn test_add_existing_task_fails_without_mutation() {
        let store = Arc::new(InMemoryTaskStore::new().with_task(deploy_task()));
        let tools = emulated_tools(store.clone());
        let out = tools
            .update_task(TaskAction::Add, "deploy_api", Some(json!({"goal": "other"})))
            .await;
        assert_eq!(out, "Error: Task 'deploy_api' already exists");
        assert_eq!(store.load("deploy_api").await.unwrap(), Some(deploy_task()));
    }

    #[tokio::test]
    async fn test_edit_missing_task_fails_without_creating() {
        let store = Arc::new(InMemoryTaskStore::new());
        let tools = emulated_tools(store.clone());
        let out = tools
            .update_task(TaskAction::Edit, "ghost", Some(json!({"goal": "boo"})))
            .await;
        assert_eq!(out, "Error: Task 'ghost' not found");
        assert!(!store.exists("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let store = Arc::new(InMemoryTaskStore::new().with_task(deploy_task()));
        let tools = emulated_tools(store.clone());

        let out = tools
            .update_task(
                TaskAction::Edit,
                "deploy_api",
                Some(json!({"goal": "Deploy v2", "steps": ["pull", "restart"]})),
            )
            .await;
        assert_eq!(out, "Task 'deploy_api' edited successfully");
        let edited = store.load("deploy_api").await.unwrap().unwrap();
        assert_eq!(edited.goal, "Deploy v2");
        assert_eq!(edited.extra["steps"], json!(["pull", "restart"]));

        assert_eq!(
            tools.update_task(TaskAction::Delete, "deploy_api", None).await,
            "Task 'deploy_api' deleted successfully"
        );
        assert_eq!(
            tools.update_task(TaskAction::Delete, "deploy_api", None).await,
            "Task 'deploy_api' not found"
        );
    }

    // ── Session ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_missing_task_falls_back_to_intent_goal() {
        let session = AgentSession::for_task("rotate_logs", Arc::new(InMemoryTaskStore::new())).await;
        assert_eq!(session.mode(), SessionMode::Task);
        assert_eq!(session.goal(), "Process rotate_logs requests");
        assert!(session.system_prompt().contains("Your goal is: Process rotate_logs requests"));
    }

    #[tokio::test]
    async fn test_malformed_task_falls_back_to_intent_goal() {
        let store = Arc::new(InMemoryTaskStore::new().with_raw("broken", json!({"commands": 3})));
        let session = AgentSession::for_task("broken", store).await;
        assert_eq!(session.goal(), "Process broken requests");
    }

    #[tokio::test]
    async fn test_meta_catalog() {
        let session = AgentSession::meta(Arc::new(InMemoryTaskStore::new()));
        let names: Vec<String> = session.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["send_message", "run_shell", "update_tasks", "list_tasks", "get_task_details"]
        );
        assert!(session.system_prompt().contains("You're currently running in meta mode"));
    }

    #[tokio::test]
    async fn test_list_available_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let tasks_dir = dir.path().join("tasks");
        let store: Arc<dyn TaskStore> = Arc::new(runbook_store::FileTaskStore::new(&tasks_dir));
        let session = AgentSession::meta(store.clone());

        assert_eq!(session.list_available_tasks().await, "No tasks directory found.");

        std::fs::create_dir_all(&tasks_dir).unwrap();
        assert_eq!(
            session.list_available_tasks().await,
            "No tasks found in tasks directory."
        );

        store.save(&deploy_task()).await.unwrap();
        std::fs::write(tasks_dir.join("corrupt.json"), "{").unwrap();
        assert_eq!(
            session.list_available_tasks().await,
            "Available tasks:\n\n- corrupt: [Error: Could not parse task file]\n- deploy_api: Deploy the API service\n"
        );
    }

    #[tokio::test]
    async fn test_get_task_details() {
        let store = Arc::new(
            InMemoryTaskStore::new()
                .with_task(deploy_task())
                .with_task(TaskDef::new("bare", "Nothing here"))
                .with_raw("broken", json!({"context": "not a map"})),
        );
        let session = AgentSession::meta(store);

        assert_eq!(
            session.get_task_details("deploy_api").await,
            "Task: deploy_api\n\nGoal: Deploy the API service\n\nContext:\n{\n  \"host\": \"api-1\"\n}\n\nCommands:\n1. cd /srv/api\n2. git pull\n"
        );
        assert_eq!(
            session.get_task_details("bare").await,
            "Task: bare\n\nGoal: Nothing here\n\nContext: No context information available.\n\nCommands: No commands defined.\n"
        );
        assert_eq!(session.get_task_details("nope").await, "Task 'nope' not found.");
        assert_eq!(
            session.get_task_details("broken").await,
            "Error: Could not parse task file for 'broken'."
        );
    }

    #[tokio::test]
    async fn test_save_context() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new().with_task(deploy_task()));
        let mut session = AgentSession::for_task("deploy_api", store.clone()).await;
        session.set_context("branch", json!("main"));
        session.save_context().await.unwrap();

        let saved = store.load("deploy_api").await.unwrap().unwrap();
        assert_eq!(saved.context["branch"], "main");
        assert_eq!(saved.context["host"], "api-1");
        assert_eq!(saved.commands, deploy_task().commands);

        let orphan = AgentSession::for_task("gone", store).await;
        assert!(matches!(
            orphan.save_context().await,
            Err(RunbookError::TaskNotFound(name)) if name == "gone"
        ));
    }

    // ── Classifier ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_classifier_leaves_history_untouched() {
        let store = InMemoryTaskStore::new()
            .with_task(deploy_task())
            .with_raw("broken", json!([1, 2]));
        let provider = Arc::new(
            MockProvider::new("mock").with_response("The user wants a deploy.\n<intent>deploy_api</intent>"),
        );
        let classifier = IntentClassifier::new(provider.clone(), &AgentConfig::default());
        let history = ConversationHistory::from_messages(vec![
            Message::user("hi"),
            Message::assistant_text("hello"),
        ]);

        let intent = classifier.classify("ship the api", &history, &store).await.unwrap();
        assert_eq!(intent.as_deref(), Some("deploy_api"));
        assert_eq!(history.len(), 2);

        let request = &provider.recorded_requests()[0];
        assert!(request.tools.is_empty());
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[2].text_content(), "ship the api");
        let system = request.system.as_deref().unwrap();
        assert!(system.contains("deploy_api: Deploy the API service\n"));
        assert!(!system.contains("broken"));
    }

    #[tokio::test]
    async fn test_classifier_no_match() {
        let provider = Arc::new(MockProvider::new("mock").with_response("<intent>NA</intent>"));
        let classifier = IntentClassifier::new(provider, &AgentConfig::default());
        let intent = classifier
            .classify("how are you?", &ConversationHistory::new(), &InMemoryTaskStore::new())
            .await
            .unwrap();
        assert!(intent.is_none());
    }

    // ── Assistant ──────────────────────────────────────────────

    fn emulated_config(policy: UnclassifiedPolicy) -> RunbookConfig {
        let mut config = RunbookConfig::default();
        config.shell.mode = ShellMode::Emulated;
        config.agent.unclassified = policy;
        config
    }

    #[tokio::test]
    async fn test_unclassified_reply_policy() {
        let provider = Arc::new(MockProvider::new("mock").with_response("<intent>NA</intent>"));
        let history = Arc::new(InMemoryHistoryStore::new());
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Reply),
            provider.clone(),
            Arc::new(InMemoryTaskStore::new()),
            history.clone(),
        );

        let replies = assistant.process_text("tell me a joke").await.unwrap();
        assert_eq!(replies, vec![NO_INTENT_REPLY]);
        assert_eq!(provider.request_count(), 1);
        assert!(history.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_unclassified_meta_policy_runs_agent() {
        let provider = Arc::new(
            MockProvider::new("mock")
                .with_response("<intent>NA</intent>")
                .with_tool_call("list_tasks", json!({}))
                .with_tool_call("send_message", json!({"message": "You have deploy_api."})),
        );
        let tasks = Arc::new(InMemoryTaskStore::new().with_task(deploy_task()));
        let history = Arc::new(InMemoryHistoryStore::new());
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Meta),
            provider.clone(),
            tasks,
            history.clone(),
        );

        let replies = assistant.process_text("what tasks do I have?").await.unwrap();
        assert_eq!(replies, vec!["You have deploy_api."]);
        let saved = ConversationHistory::from_messages(history.snapshot());
        assert_alternates(&saved);
        assert_eq!(
            tool_results(&saved)[0],
            "Available tasks:\n\n- deploy_api: Deploy the API service\n"
        );
    }

    #[tokio::test]
    async fn test_task_turn_uses_task_prompt() {
        let provider = Arc::new(
            MockProvider::new("mock")
                .with_response("<intent>deploy_api</intent>")
                .with_tool_call("send_message", json!({"message": "Shall I run 2 commands?"})),
        );
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Meta),
            provider.clone(),
            Arc::new(InMemoryTaskStore::new().with_task(deploy_task())),
            Arc::new(InMemoryHistoryStore::new()),
        );

        let replies = assistant.process_text("deploy please").await.unwrap();
        assert_eq!(replies, vec!["Shall I run 2 commands?"]);
        let agent_request = &provider.recorded_requests()[1];
        let system = agent_request.system.as_deref().unwrap();
        assert!(system.contains("Current task name: deploy_api"));
        assert!(system.contains("Commands to execute:\ncd /srv/api\ngit pull\n"));
        assert_eq!(agent_request.tools.len(), 3);
    }

    #[tokio::test]
    async fn test_trailing_user_turn_is_repaired() {
        let provider = Arc::new(
            MockProvider::new("mock")
                .with_response("<intent>NA</intent>")
                .with_response("Hello again!"),
        );
        let history = Arc::new(InMemoryHistoryStore::with_messages(vec![Message::user(
            "are you there?",
        )]));
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Meta),
            provider.clone(),
            Arc::new(InMemoryTaskStore::new()),
            history.clone(),
        );

        assistant.process_text("hello?").await.unwrap();

        let classify_request = &provider.recorded_requests()[0];
        assert_eq!(classify_request.messages[1].text_content(), LISTENING_REPLY);
        let saved = history.snapshot();
        assert_eq!(saved[0].text_content(), "are you there?");
        assert_eq!(saved[1].text_content(), LISTENING_REPLY);
        assert_eq!(saved[2].text_content(), "hello?");
        assert_alternates(&ConversationHistory::from_messages(saved));
    }

    #[tokio::test]
    async fn test_refusal_reaches_caller_and_history_is_kept() {
        let provider = Arc::new(MockProvider::new("mock").with_refusal());
        let seeded = vec![Message::user("hi"), Message::assistant_text("hello")];
        let history = Arc::new(InMemoryHistoryStore::with_messages(seeded.clone()));
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Meta),
            provider,
            Arc::new(InMemoryTaskStore::new()),
            history.clone(),
        );

        let err = assistant.process_text("something").await.unwrap_err();
        assert!(err.is_refusal());
        assert_eq!(history.snapshot(), seeded);
    }

    #[tokio::test]
    async fn test_blank_message_leaves_history_untouched() {
        let provider = Arc::new(MockProvider::new("mock").with_response("<intent>NA</intent>"));
        let seeded = vec![Message::user("hi"), Message::assistant_text("hello")];
        let history = Arc::new(InMemoryHistoryStore::with_messages(seeded.clone()));
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Meta),
            provider.clone(),
            Arc::new(InMemoryTaskStore::new()),
            history.clone(),
        );

        assert!(assistant.process_text("  ").await.is_err());
        assert_eq!(provider.request_count(), 0);
        assert_eq!(history.snapshot(), seeded);
    }

    #[tokio::test]
    async fn test_fresh_emulator_each_turn() {
        let provider = Arc::new(
            MockProvider::new("mock")
                .with_response("<intent>NA</intent>")
                .with_tool_call("run_shell", json!({"command": "cd motionapps"}))
                .with_response("moved")
                .with_response("<intent>NA</intent>")
                .with_tool_call("run_shell", json!({"command": "pwd"}))
                .with_response("printed"),
        );
        let history = Arc::new(InMemoryHistoryStore::new());
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Meta),
            provider,
            Arc::new(InMemoryTaskStore::new()),
            history.clone(),
        );

        assistant.process_text("go to the project").await.unwrap();
        assistant.process_text("where am I?").await.unwrap();

        let saved = ConversationHistory::from_messages(history.snapshot());
        assert_eq!(tool_results(&saved).last().unwrap(), "/home/pablo");
    }

    struct FixedTranscriber(&'static str);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn transcribe(&self, _audio: Vec<u8>, _file_name: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_process_audio() {
        let provider = Arc::new(
            MockProvider::new("mock")
                .with_response("<intent>NA</intent>")
                .with_response("Heard you."),
        );
        let assistant = Assistant::new(
            emulated_config(UnclassifiedPolicy::Meta),
            provider.clone(),
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryHistoryStore::new()),
        );

        let err = assistant.process_audio(vec![1, 2, 3], "voice.ogg").await.unwrap_err();
        assert!(matches!(err, RunbookError::Transcription(_)));

        let assistant = assistant.with_transcriber(Arc::new(FixedTranscriber("restart nginx")));
        let replies = assistant.process_audio(vec![1, 2, 3], "voice.ogg").await.unwrap();
        assert_eq!(replies, vec!["Heard you."]);
        assert_eq!(
            provider.recorded_requests()[0].messages[0].text_content(),
            "restart nginx"
        );
    }
}
