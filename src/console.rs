// 🖥️ Console - text menu protocol over the banking service
//
// Menu choices are parsed into command enums and dispatched with `match`.
// Input and output are generic so the whole protocol can be driven from tests.

use crate::db::AccountStore;
use crate::error::BankError;
use crate::luhn;
use crate::service::BankingService;
use anyhow::Result;
use std::io::{BufRead, Write};
use std::str::FromStr;
use thiserror::Error;
use tracing::error;

// ============================================================================
// COMMANDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown menu choice")]
pub struct UnknownChoice;

/// Top-level menu (logged out)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainCommand {
    CreateAccount,
    LogIn,
    Exit,
}

impl MainCommand {
    pub const MENU: &'static str = "1. Create an account\n2. Log into account\n0. Exit";
}

impl FromStr for MainCommand {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(MainCommand::CreateAccount),
            "2" => Ok(MainCommand::LogIn),
            "0" => Ok(MainCommand::Exit),
            _ => Err(UnknownChoice),
        }
    }
}

/// Account menu (logged in)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCommand {
    Balance,
    AddIncome,
    Transfer,
    CloseAccount,
    LogOut,
    Exit,
}

impl AccountCommand {
    pub const MENU: &'static str =
        "1. Balance\n2. Add income\n3. Do transfer\n4. Close account\n5. Log out\n0. Exit";
}

impl FromStr for AccountCommand {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(AccountCommand::Balance),
            "2" => Ok(AccountCommand::AddIncome),
            "3" => Ok(AccountCommand::Transfer),
            "4" => Ok(AccountCommand::CloseAccount),
            "5" => Ok(AccountCommand::LogOut),
            "0" => Ok(AccountCommand::Exit),
            _ => Err(UnknownChoice),
        }
    }
}

/// What the caller should do after a menu step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Stay,
    Leave,
    Quit,
}

/// User-facing text for a rejected operation.
pub fn rejection_message(err: &BankError) -> String {
    match err {
        BankError::InvalidAmount(_) => "Amount must be a positive number!".to_string(),
        BankError::InvalidChecksum => {
            "Probably you made a mistake in the card number. Please try again!".to_string()
        }
        BankError::AuthFailure => "Wrong card number or PIN!".to_string(),
        BankError::SameAccount => "You can't transfer money to the same account!".to_string(),
        BankError::TargetNotFound => "Such a card does not exist.".to_string(),
        BankError::InsufficientFunds { .. } => "Not enough money!".to_string(),
        BankError::NotLoggedIn => "You are not logged in.".to_string(),
        BankError::IdentityExhausted(_) | BankError::Store(_) => {
            format!("Something went wrong: {}", err)
        }
    }
}

/// One-line verdict for the `check` subcommand.
pub fn card_number_report(number: &str) -> String {
    if luhn::is_valid(number) {
        format!("{} is a valid card number", number)
    } else {
        format!("{} is NOT a valid card number", number)
    }
}

/// Every stored account as pretty JSON, PINs omitted.
pub fn accounts_json(store: &AccountStore) -> Result<String> {
    let accounts = store.all_accounts()?;
    Ok(serde_json::to_string_pretty(&accounts)?)
}

// ============================================================================
// CONSOLE
// ============================================================================

pub struct Console<'a, R, W> {
    store: &'a mut AccountStore,
    service: BankingService,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(store: &'a mut AccountStore, service: BankingService, input: R, output: W) -> Self {
        Self {
            store,
            service,
            input,
            output,
        }
    }

    /// Run until the user exits or input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.output, "{}", MainCommand::MENU)?;
            let Some(line) = self.read_line()? else {
                return self.say_bye();
            };

            let flow = match line.parse::<MainCommand>() {
                Ok(MainCommand::CreateAccount) => self.create_account()?,
                Ok(MainCommand::LogIn) => self.log_in()?,
                Ok(MainCommand::Exit) => Flow::Quit,
                Err(UnknownChoice) => {
                    writeln!(self.output, "\nInvalid option. Try again.\n")?;
                    Flow::Stay
                }
            };

            if flow == Flow::Quit {
                return self.say_bye();
            }
        }
    }

    fn create_account(&mut self) -> Result<Flow> {
        match self.service.create_account(self.store) {
            Ok(creds) => {
                writeln!(self.output, "\nYour card has been created")?;
                writeln!(self.output, "Your card number:\n{}", creds.number)?;
                writeln!(self.output, "Your card PIN:\n{}\n", creds.pin)?;
            }
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    fn log_in(&mut self) -> Result<Flow> {
        writeln!(self.output, "\nEnter your card number:")?;
        let Some(number) = self.read_line()? else {
            return Ok(Flow::Quit);
        };
        writeln!(self.output, "Enter your PIN:")?;
        let Some(pin) = self.read_line()? else {
            return Ok(Flow::Quit);
        };

        match self.service.login(self.store, &number, &pin) {
            Ok(()) => {
                writeln!(self.output, "\nYou have successfully logged in!\n")?;
                self.account_loop()
            }
            Err(e) => {
                self.report(&e)?;
                Ok(Flow::Stay)
            }
        }
    }

    fn account_loop(&mut self) -> Result<Flow> {
        loop {
            writeln!(self.output, "{}", AccountCommand::MENU)?;
            let Some(line) = self.read_line()? else {
                return Ok(Flow::Quit);
            };

            let flow = match line.parse::<AccountCommand>() {
                Ok(AccountCommand::Balance) => self.show_balance()?,
                Ok(AccountCommand::AddIncome) => self.add_income()?,
                Ok(AccountCommand::Transfer) => self.transfer()?,
                Ok(AccountCommand::CloseAccount) => self.close_account()?,
                Ok(AccountCommand::LogOut) => {
                    self.service.logout();
                    writeln!(self.output, "\nYou have successfully logged out!\n")?;
                    Flow::Leave
                }
                Ok(AccountCommand::Exit) => Flow::Quit,
                Err(UnknownChoice) => {
                    writeln!(self.output, "\nInvalid option. Try again.\n")?;
                    Flow::Stay
                }
            };

            match flow {
                Flow::Stay if self.service.session().is_logged_in() => {}
                Flow::Quit => return Ok(Flow::Quit),
                _ => return Ok(Flow::Stay),
            }
        }
    }

    fn show_balance(&mut self) -> Result<Flow> {
        match self.service.balance(self.store) {
            Ok(balance) => writeln!(self.output, "\nBalance: {}\n", balance)?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    fn add_income(&mut self) -> Result<Flow> {
        writeln!(self.output, "\nEnter income:")?;
        let Some(amount) = self.read_amount()? else {
            return Ok(Flow::Stay);
        };

        match self.service.add_income(self.store, amount) {
            Ok(_) => writeln!(self.output, "Income was added!\n")?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    fn transfer(&mut self) -> Result<Flow> {
        writeln!(self.output, "\nTransfer\nEnter card number:")?;
        let Some(target) = self.read_line()? else {
            return Ok(Flow::Quit);
        };

        if let Err(e) = self.service.check_transfer_target(self.store, &target) {
            self.report(&e)?;
            return Ok(Flow::Stay);
        }

        writeln!(self.output, "Enter how much money you want to transfer:")?;
        let Some(amount) = self.read_amount()? else {
            return Ok(Flow::Stay);
        };

        match self.service.transfer(self.store, &target, amount) {
            Ok(()) => writeln!(self.output, "Success!\n")?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    fn close_account(&mut self) -> Result<Flow> {
        match self.service.close_account(self.store) {
            Ok(()) => {
                writeln!(self.output, "\nThe account has been closed!\n")?;
                Ok(Flow::Leave)
            }
            Err(e) => {
                self.report(&e)?;
                Ok(Flow::Stay)
            }
        }
    }

    // ------------------------------------------------------------------------
    // I/O helpers
    // ------------------------------------------------------------------------

    /// Next input line without its line ending; `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Parse an integer amount; unparsable input is reported, not fatal.
    fn read_amount(&mut self) -> Result<Option<i64>> {
        let Some(raw) = self.read_line()? else {
            return Ok(None);
        };

        match raw.parse::<i64>() {
            Ok(amount) => Ok(Some(amount)),
            Err(_) => {
                writeln!(self.output, "{}\n", rejection_message(&BankError::InvalidAmount(0)))?;
                Ok(None)
            }
        }
    }

    fn report(&mut self, err: &BankError) -> Result<()> {
        if !err.is_user_error() {
            error!(error = %err, "operation failed");
        }
        writeln!(self.output, "\n{}\n", rejection_message(err))?;
        Ok(())
    }

    fn say_bye(&mut self) -> Result<()> {
        writeln!(self.output, "\nBye!")?;
        self.output.flush()?;
        Ok(())
    }
}
