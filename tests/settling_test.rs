mod common;

use anyhow::Result;
use common::{add_people, balance_of, pay, test_service};
use divvy::application::AppError;
use divvy::domain::{ExpenseError, ExpenseUpdate, NewExpense, Settlement};

#[tokio::test]
async fn test_two_people_split_lunch() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["P1", "P2"]).await?;
    let (p1, p2) = (ids[0], ids[1]);

    pay(&mut service, "Lunch", 2000, p1, &[p1, p2]).await?;

    assert_eq!(balance_of(&service, p1), 1000);
    assert_eq!(balance_of(&service, p2), -1000);
    assert_eq!(service.settlement_plan(), vec![Settlement::new(p2, p1, 1000)]);

    Ok(())
}

#[tokio::test]
async fn test_three_people_offsetting_expenses() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["A", "B", "C"]).await?;
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    pay(&mut service, "Groceries", 3000, a, &ids).await?;
    pay(&mut service, "Taxi", 1500, b, &ids).await?;

    let balances = service.balances();
    assert_eq!(balances[0].total_paid, 3000);
    assert_eq!(balances[0].total_owed, 1500);
    assert_eq!(balance_of(&service, a), 1500);
    assert_eq!(balance_of(&service, b), 0);
    assert_eq!(balance_of(&service, c), -1500);

    assert_eq!(service.settlement_plan(), vec![Settlement::new(c, a, 1500)]);

    let lines = service.describe_plan();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].from_name, "C");
    assert_eq!(lines[0].to_name, "A");

    Ok(())
}

#[tokio::test]
async fn test_removing_payer_deletes_their_expenses() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["P1", "P2", "P3"]).await?;
    let (p1, p2, p3) = (ids[0], ids[1], ids[2]);

    pay(&mut service, "Hotel", 9000, p1, &[p2, p3]).await?;
    pay(&mut service, "Dinner", 3000, p2, &[p1, p2, p3]).await?;

    let removal = service.remove_participant(p1).await.unwrap();
    assert_eq!(removal.participant.name, "P1");
    assert_eq!(removal.deleted_expenses.len(), 1);
    assert_eq!(removal.pruned_expenses.len(), 1);

    let expenses = service.list_expenses();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].description, "Dinner");
    assert_eq!(expenses[0].split_among, vec![p2, p3]);

    // Dinner is now shared by the two who remain
    assert_eq!(balance_of(&service, p2), 1500);
    assert_eq!(balance_of(&service, p3), -1500);

    Ok(())
}

#[tokio::test]
async fn test_settle_up_freezes_history() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["A", "B", "C"]).await?;
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    pay(&mut service, "Groceries", 3000, a, &ids).await?;
    pay(&mut service, "Taxi", 1500, b, &ids).await?;

    let outcome = service.settle_up().await.unwrap();
    assert_eq!(outcome.settled_expenses, 2);
    assert_eq!(outcome.payments, vec![Settlement::new(c, a, 1500)]);

    let expenses = service.list_expenses();
    assert_eq!(expenses.len(), 3);
    for expense in &expenses[..2] {
        assert!(expense.is_settled);
        assert_eq!(expense.settlement_id, Some(outcome.settlement_id));
    }

    let record = &expenses[2];
    assert!(record.is_settlement);
    assert_eq!(record.id, outcome.settlement_id);
    assert_eq!(record.settlement_details, outcome.payments);

    let history = service.history();
    let entry = history.iter().find(|h| h.is_settlement).unwrap();
    assert_eq!(entry.id, outcome.settlement_id);
    assert_eq!(entry.payments.len(), 1);
    assert_eq!(entry.payments[0].from_name, "C");

    assert!(service.balances().iter().all(|b| b.balance == 0));
    assert!(service.settlement_plan().is_empty());

    // Nothing left to settle
    assert!(service.settle_up().await.is_none());
    assert_eq!(service.list_expenses().len(), 3);

    // Settled totals still count towards all-time spending
    let summary = service.summary();
    assert_eq!(summary.total_expenses, 4500);
    assert_eq!(summary.active_total, 0);
    assert_eq!(summary.settlement_count, 1);
    assert!(summary.last_settlement.is_some());

    Ok(())
}

#[tokio::test]
async fn test_new_expenses_after_settling_start_fresh() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["A", "B"]).await?;
    let (a, b) = (ids[0], ids[1]);

    pay(&mut service, "Lunch", 2000, a, &ids).await?;
    service.settle_up().await.unwrap();

    pay(&mut service, "Coffee", 800, b, &ids).await?;
    assert_eq!(balance_of(&service, a), -400);
    assert_eq!(balance_of(&service, b), 400);
    assert_eq!(service.settlement_plan(), vec![Settlement::new(a, b, 400)]);

    Ok(())
}

#[tokio::test]
async fn test_invalid_expenses_are_rejected_without_change() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["A", "B"]).await?;
    let a = ids[0];

    let zero = service
        .add_expense(NewExpense::new("Nothing", 0, a, ids.clone()))
        .await;
    assert!(matches!(
        zero,
        Err(AppError::InvalidExpense(ExpenseError::InvalidAmount(0)))
    ));

    let empty = service
        .add_expense(NewExpense::new("Lonely", 500, a, Vec::new()))
        .await;
    assert!(matches!(
        empty,
        Err(AppError::InvalidExpense(ExpenseError::EmptySplit))
    ));

    let blank = service
        .add_expense(NewExpense::new("   ", 500, a, ids.clone()))
        .await;
    assert!(matches!(
        blank,
        Err(AppError::InvalidExpense(ExpenseError::BlankDescription))
    ));

    assert!(service.list_expenses().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_uneven_split_still_nets_to_zero() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["A", "B", "C"]).await?;

    pay(&mut service, "Pizza", 1000, ids[0], &ids).await?;

    let balances = service.balances();
    let owed: i64 = balances.iter().map(|b| b.total_owed).sum();
    let net: i64 = balances.iter().map(|b| b.balance).sum();
    assert_eq!(owed, 1000);
    assert_eq!(net, 0);

    let plan = service.settlement_plan();
    let moved: i64 = plan.iter().map(|s| s.amount_cents).sum();
    assert_eq!(moved, balance_of(&service, ids[0]));

    Ok(())
}

#[tokio::test]
async fn test_update_expense() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["A", "B"]).await?;
    let (a, b) = (ids[0], ids[1]);

    let expense = service
        .add_expense(NewExpense::new("Lunch", 2000, a, ids.clone()))
        .await?;

    let update = ExpenseUpdate {
        amount_cents: Some(3000),
        paid_by: Some(b),
        ..Default::default()
    };
    let updated = service.update_expense(expense.id, &update).await?.unwrap();
    assert_eq!(updated.amount_cents, 3000);
    assert_eq!(updated.paid_by, Some(b));
    assert_eq!(balance_of(&service, b), 1500);

    // Invalid patches leave the expense untouched
    let bad = ExpenseUpdate {
        split_among: Some(Vec::new()),
        ..Default::default()
    };
    assert!(service.update_expense(expense.id, &bad).await.is_err());
    assert_eq!(service.get_expense(expense.id)?.split_among.len(), 2);

    // Settled expenses are frozen
    service.settle_up().await.unwrap();
    let late = ExpenseUpdate {
        description: Some("Brunch".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        service.update_expense(expense.id, &late).await,
        Err(AppError::InvalidExpense(ExpenseError::AlreadySettled(_)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_unknown_ids_are_no_ops() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ids = add_people(&mut service, &["A", "B"]).await?;
    pay(&mut service, "Lunch", 2000, ids[0], &ids).await?;

    let missing = uuid::Uuid::new_v4();
    assert!(service.remove_participant(missing).await.is_none());
    assert!(service.remove_expense(missing).await.is_none());
    let update = ExpenseUpdate {
        amount_cents: Some(100),
        ..Default::default()
    };
    assert!(service.update_expense(missing, &update).await?.is_none());

    assert_eq!(service.list_participants().len(), 2);
    assert_eq!(service.list_expenses().len(), 1);
    Ok(())
}
