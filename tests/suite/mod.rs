mod cycle;
mod reload;
