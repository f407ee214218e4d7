use std::time::Duration as StdDuration;

use practice_core::evaluator::UserResponse;
use practice_core::model::{FeedbackPolicy, Item, ItemKind, SessionSummary};
use services::{
    PracticeAnswerResult, PracticeLoopService, PracticeSession, SessionError, SessionPhase,
    TimerEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::unbounded_channel;

const TIMER_TICK: StdDuration = StdDuration::from_secs(1);
const LOW_TIME_WARNING_SECS: i64 = 10;

/// One line of user input, interpreted against the current item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Respond(UserResponse),
    Skip,
    Quit,
}

pub fn parse_input(line: &str, item: &Item) -> Input {
    let trimmed = line.trim();
    match trimmed {
        ":q" | ":quit" => return Input::Quit,
        ":s" | ":skip" => return Input::Skip,
        _ => {}
    }

    if item.kind() == ItemKind::Flashcard {
        match trimmed {
            ":y" => return Input::Respond(UserResponse::SelfGrade(true)),
            ":n" => return Input::Respond(UserResponse::SelfGrade(false)),
            _ => {}
        }
    }

    if let Some(options) = item.options() {
        if let Ok(choice) = trimmed.parse::<usize>() {
            if (1..=options.len()).contains(&choice) {
                return Input::Respond(UserResponse::Choice(choice - 1));
            }
        }
    }

    Input::Respond(UserResponse::typed(trimmed))
}

fn help_line(item: &Item) -> &'static str {
    match item.kind() {
        ItemKind::Flashcard => "type the answer, or :y / :n to grade yourself (:s skip, :q quit)",
        ItemKind::MultipleChoice => "pick an option number or type the answer (:s skip, :q quit)",
        ItemKind::Typing => "type the answer (:s skip, :q quit)",
    }
}

fn render_item(session: &PracticeSession, now: chrono::DateTime<chrono::Utc>) {
    let Some(item) = session.current_item() else {
        return;
    };
    let progress = session.progress();
    let position = if session.is_reviewing() {
        "review".to_string()
    } else {
        format!("{}/{}", progress.position + 1, progress.total)
    };
    let remaining = session
        .remaining_time(now)
        .map(|left| format!("  ({}s left)", left.num_seconds()))
        .unwrap_or_default();

    println!();
    println!("[{position}] {}{remaining}", item.prompt());
    if let Some(options) = item.options() {
        for (index, option) in options.iter().enumerate() {
            println!("  {}) {option}", index + 1);
        }
    }
}

fn print_feedback(result: &PracticeAnswerResult, expected: &str) {
    if result.answer.record.is_skipped() {
        println!("Skipped. Answer: {expected}");
    } else if result.answer.record.is_correct() {
        println!("Correct!");
    } else {
        println!("Wrong. Answer: {expected}");
    }
    if result.answer.queued_for_review {
        println!("(will come back for review)");
    }
}

pub fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Session complete ({}).", summary.mode().as_str());
    println!(
        "  correct   {}/{} ({}%)",
        summary.correct(),
        summary.total_answers(),
        summary.accuracy_percent()
    );
    println!(
        "  points    {}/{} ({}%)",
        summary.points(),
        summary.max_points(),
        summary.score_percent()
    );
    if summary.skipped() > 0 {
        println!("  skipped   {}", summary.skipped());
    }
    if summary.review_attempts() > 0 {
        println!("  reviews   {}", summary.review_attempts());
    }
    println!("  duration  {}s", summary.duration().num_seconds());
    if summary.timed_out() {
        println!("  time ran out");
    }
}

/// Drive a session from stdin until it completes, the user quits, or input
/// ends.
///
/// # Errors
///
/// Returns stdin read failures and session errors other than rejected input.
pub async fn run_session(
    loop_svc: &PracticeLoopService,
    mut session: PracticeSession,
    feedback: FeedbackPolicy,
) -> Result<SessionSummary, Box<dyn std::error::Error>> {
    let clock = loop_svc.clock();
    let delay = feedback.delay_for(session.mode());
    let (tx, mut timer_rx) = unbounded_channel();
    let timer = loop_svc.start_timer(&session, TIMER_TICK, tx);
    let mut timer_live = timer.is_some();
    let mut warned = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(item) = session.current_item() {
        println!("{}", help_line(item));
    }
    render_item(&session, clock.now());

    while !session.is_complete() {
        tokio::select! {
            event = timer_rx.recv(), if timer_live => match event {
                Some(TimerEvent::Expired) => {
                    if loop_svc.expire(&mut session) {
                        println!("\nTime is up.");
                    }
                }
                Some(TimerEvent::Tick { remaining }) => {
                    if !warned && remaining <= chrono::Duration::seconds(LOW_TIME_WARNING_SECS) {
                        warned = true;
                        println!("\n{}s left", remaining.num_seconds());
                    }
                }
                None => timer_live = false,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    log::debug!("stdin closed, ending session");
                    break;
                };
                let Some(item) = session.current_item() else {
                    break;
                };
                let expected = item.expected_answer().to_string();
                let result = match parse_input(&line, item) {
                    Input::Quit => break,
                    Input::Skip => loop_svc.skip(&mut session).await,
                    Input::Respond(response) => loop_svc.answer(&mut session, &response).await,
                };

                match result {
                    Ok(result) => {
                        print_feedback(&result, &expected);
                        if result.phase == SessionPhase::Answered {
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            match loop_svc.advance(&mut session) {
                                Ok(_) | Err(SessionError::Completed) => {}
                                Err(e) => return Err(e.into()),
                            }
                        }
                        render_item(&session, clock.now());
                    }
                    Err(e) if e.is_empty_answer() => {
                        if let Some(item) = session.current_item() {
                            println!("{}", help_line(item));
                        }
                    }
                    Err(SessionError::Evaluator(e)) => println!("{e}"),
                    Err(SessionError::Completed) => println!("\nTime is up."),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    drop(timer);
    Ok(loop_svc.finish(&mut session)?)
}
