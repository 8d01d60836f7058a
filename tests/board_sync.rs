use std::sync::Arc;

use genboard::config::BoardConfig;
use genboard::gateway::{BoardBackend, BoardDefaults, FileBackend, MemoryBackend};
use genboard::import::TaskDraft;
use genboard::lifecycle::BoardController;
use genboard::model::Board;
use genboard::reorder::{DropLocation, DropResult};

fn titles(board: &Board, column_index: usize) -> Vec<String> {
    let column_id = &board.column_order[column_index];
    board
        .tasks_in(column_id)
        .into_iter()
        .map(|task| task.title.clone())
        .collect()
}

fn rename_newest(controller: &mut BoardController, column_id: &str, title: &str) {
    let board = controller.board();
    let id = board.columns[column_id].task_ids[0].clone();
    let mut task = board.tasks[&id].clone();
    task.title = title.to_string();
    controller.update_task(task).expect("update applies");
}

#[tokio::test]
async fn file_backend_round_trips_the_optimistic_board() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("board.json");
    let config = BoardConfig::default();
    let backend: Arc<dyn BoardBackend> = Arc::new(FileBackend::new(
        &path,
        BoardDefaults::from_config(&config),
    ));

    let (mut controller, mut reports) =
        BoardController::open(backend.clone(), "alice", config.clone()).await?;
    let board = controller.board();
    assert_eq!(board.column_order.len(), 3);
    let todo = board.column_order[0].clone();
    let doing = board.column_order[1].clone();

    for title in ["one", "two", "three"] {
        controller.create_task(&todo).expect("column exists");
        controller.drain().await;
        rename_newest(&mut controller, &todo, title);
        controller.drain().await;
    }
    assert_eq!(titles(&controller.board(), 0), vec!["three", "two", "one"]);

    let two = controller.board().columns[&todo].task_ids[1].clone();
    controller
        .move_task(&DropResult::new(
            two,
            DropLocation::new(todo.clone(), 1),
            DropLocation::new(doing.clone(), 0),
        ))
        .expect("move applies");
    controller.reorder_columns(2, 0).expect("reorder applies");
    controller.drain().await;

    while let Ok(report) = reports.try_recv() {
        assert!(report.is_ok(), "sync failed: {report:?}");
    }

    let optimistic = controller.board();
    let (reopened, _reports) = BoardController::open(backend, "alice", config).await?;
    let persisted = reopened.board();
    assert_eq!(persisted.column_order, optimistic.column_order);
    for index in 0..3 {
        assert_eq!(titles(&persisted, index), titles(&optimistic, index));
    }
    assert_eq!(titles(&persisted, 1), vec!["three", "one"]);
    assert_eq!(titles(&persisted, 2), vec!["two"]);
    assert!(persisted.check_invariants().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_sync_keeps_the_optimistic_board() -> Result<(), Box<dyn std::error::Error>> {
    let config = BoardConfig::default();
    let memory = Arc::new(MemoryBackend::new(BoardDefaults::from_config(&config)));
    memory.fail_on("create_column");

    let (mut controller, mut reports) =
        BoardController::open(memory.clone(), "bob", config).await?;
    let applied = controller.create_column("Review").expect("column applied");
    controller.drain().await;

    assert_eq!(applied.board.column_order.len(), 4);
    assert_eq!(controller.board().column_order.len(), 4);

    let report = reports.try_recv()?;
    assert_eq!(report.op, "create_column");
    assert!(!report.is_ok());
    assert_eq!(memory.tables().columns.len(), 3);
    Ok(())
}

#[tokio::test]
async fn boards_are_scoped_to_their_user() -> Result<(), Box<dyn std::error::Error>> {
    let config = BoardConfig::default();
    let memory: Arc<dyn BoardBackend> =
        Arc::new(MemoryBackend::new(BoardDefaults::from_config(&config)));

    let (mut alice, _) = BoardController::open(memory.clone(), "alice", config.clone()).await?;
    let todo = alice.board().column_order[0].clone();
    alice.create_task(&todo).expect("task applied");
    alice.drain().await;

    let (bob, _) = BoardController::open(memory.clone(), "bob", config.clone()).await?;
    assert_ne!(bob.session().board_id, alice.session().board_id);
    assert!(bob.board().tasks.is_empty());

    let (alice_again, _) = BoardController::open(memory, "alice", config).await?;
    assert_eq!(alice_again.session().board_id, alice.session().board_id);
    assert_eq!(alice_again.board().tasks.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn large_import_reaches_the_file_backend() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = BoardConfig::default();
    let backend: Arc<dyn BoardBackend> = Arc::new(FileBackend::new(
        dir.path().join("board.json"),
        BoardDefaults::from_config(&config),
    ));

    let (mut controller, mut reports) =
        BoardController::open(backend.clone(), "alice", config.clone()).await?;
    let todo = controller.board().column_order[0].clone();
    let drafts: Vec<TaskDraft> = (0..1000)
        .map(|i| TaskDraft::titled(format!("line {i}")))
        .collect();
    let applied = controller.import_tasks(&todo, drafts).expect("import applies");
    assert_eq!(applied.ops.len(), 1000);
    controller.drain().await;

    let mut received = 0;
    while let Ok(report) = reports.try_recv() {
        assert!(report.is_ok(), "sync failed: {report:?}");
        received += 1;
    }
    assert_eq!(received, 1000);

    let local = controller.board();
    let (reopened, _reports) = BoardController::open(backend, "alice", config).await?;
    let remote = reopened.board();
    assert_eq!(remote.tasks.len(), local.tasks.len());
    assert_eq!(remote.columns[&todo].task_ids, local.columns[&todo].task_ids);
    Ok(())
}
